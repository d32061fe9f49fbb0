//! Table accessors for the inference schemas, laid out the way `flatc`
//! generates them.
//!
//! Both schema versions share these tables; the zone detection version adds
//! `zoneflag` to `GeneralObject`. Accessors are only reachable through
//! [`root`], which runs the verifier over the whole buffer first.

use flatbuffers::{
    ForwardsUOffset, Follow, InvalidFlatbuffer, Table, VOffsetT, Vector, Verifiable, Verifier,
};

/// `BoundingBox` union tag of the 2-D box variant
pub const BOUNDING_BOX_2D: u8 = 1;

/// Verify `buf` and open its `ObjectDetectionTop` root table
pub fn root(buf: &[u8]) -> Result<ObjectDetectionTop<'_>, InvalidFlatbuffer> {
    flatbuffers::root::<ObjectDetectionTop>(buf)
}

#[derive(Copy, Clone, PartialEq)]
pub struct ObjectDetectionTop<'a> {
    _tab: Table<'a>,
}

impl<'a> Follow<'a> for ObjectDetectionTop<'a> {
    type Inner = ObjectDetectionTop<'a>;

    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: Table::new(buf, loc),
        }
    }
}

impl<'a> ObjectDetectionTop<'a> {
    pub const VT_PERCEPTION: VOffsetT = 4;

    #[inline]
    pub fn perception(&self) -> Option<ObjectDetectionData<'a>> {
        // SAFETY: the buffer was verified by `root`
        unsafe {
            self._tab
                .get::<ForwardsUOffset<ObjectDetectionData>>(Self::VT_PERCEPTION, None)
        }
    }
}

impl Verifiable for ObjectDetectionTop<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<ObjectDetectionData>>(
                "perception",
                Self::VT_PERCEPTION,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Copy, Clone, PartialEq)]
pub struct ObjectDetectionData<'a> {
    _tab: Table<'a>,
}

impl<'a> Follow<'a> for ObjectDetectionData<'a> {
    type Inner = ObjectDetectionData<'a>;

    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: Table::new(buf, loc),
        }
    }
}

impl<'a> ObjectDetectionData<'a> {
    pub const VT_OBJECT_DETECTION_LIST: VOffsetT = 4;

    #[inline]
    pub fn object_detection_list(&self) -> Option<Vector<'a, ForwardsUOffset<GeneralObject<'a>>>> {
        // SAFETY: the buffer was verified by `root`
        unsafe {
            self._tab
                .get::<ForwardsUOffset<Vector<'a, ForwardsUOffset<GeneralObject>>>>(
                    Self::VT_OBJECT_DETECTION_LIST,
                    None,
                )
        }
    }
}

impl Verifiable for ObjectDetectionData<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<Vector<'_, ForwardsUOffset<GeneralObject>>>>(
                "object_detection_list",
                Self::VT_OBJECT_DETECTION_LIST,
                false,
            )?
            .finish();
        Ok(())
    }
}

#[derive(Copy, Clone, PartialEq)]
pub struct GeneralObject<'a> {
    _tab: Table<'a>,
}

impl<'a> Follow<'a> for GeneralObject<'a> {
    type Inner = GeneralObject<'a>;

    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: Table::new(buf, loc),
        }
    }
}

impl<'a> GeneralObject<'a> {
    pub const VT_CLASS_ID: VOffsetT = 4;
    pub const VT_BOUNDING_BOX_TYPE: VOffsetT = 6;
    pub const VT_BOUNDING_BOX: VOffsetT = 8;
    pub const VT_SCORE: VOffsetT = 10;
    /// Zone detection schema only
    pub const VT_ZONEFLAG: VOffsetT = 12;

    #[inline]
    pub fn class_id(&self) -> u32 {
        // SAFETY: the buffer was verified by `root`
        unsafe { self._tab.get::<u32>(Self::VT_CLASS_ID, Some(0)) }.unwrap_or(0)
    }

    #[inline]
    pub fn bounding_box_type(&self) -> u8 {
        // SAFETY: the buffer was verified by `root`
        unsafe { self._tab.get::<u8>(Self::VT_BOUNDING_BOX_TYPE, Some(0)) }.unwrap_or(0)
    }

    /// Union value read as a 2-D box, whatever the tag says
    #[inline]
    pub fn bounding_box_as_2d(&self) -> Option<BoundingBox2d<'a>> {
        // SAFETY: the buffer was verified by `root`, with this slot as a `BoundingBox2d`
        unsafe {
            self._tab
                .get::<ForwardsUOffset<BoundingBox2d>>(Self::VT_BOUNDING_BOX, None)
        }
    }

    #[inline]
    pub fn score(&self) -> f32 {
        // SAFETY: the buffer was verified by `root`
        unsafe { self._tab.get::<f32>(Self::VT_SCORE, Some(0.0)) }.unwrap_or(0.0)
    }

    #[inline]
    pub fn zoneflag(&self) -> bool {
        // SAFETY: the buffer was verified by `root`
        unsafe { self._tab.get::<bool>(Self::VT_ZONEFLAG, Some(false)) }.unwrap_or(false)
    }
}

impl Verifiable for GeneralObject<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        // `BoundingBox2d` is the only union variant, so the value is checked as one
        v.visit_table(pos)?
            .visit_field::<u32>("class_id", Self::VT_CLASS_ID, false)?
            .visit_field::<u8>("bounding_box_type", Self::VT_BOUNDING_BOX_TYPE, false)?
            .visit_field::<ForwardsUOffset<BoundingBox2d>>(
                "bounding_box",
                Self::VT_BOUNDING_BOX,
                false,
            )?
            .visit_field::<f32>("score", Self::VT_SCORE, false)?
            .visit_field::<bool>("zoneflag", Self::VT_ZONEFLAG, false)?
            .finish();
        Ok(())
    }
}

#[derive(Copy, Clone, PartialEq)]
pub struct BoundingBox2d<'a> {
    _tab: Table<'a>,
}

impl<'a> Follow<'a> for BoundingBox2d<'a> {
    type Inner = BoundingBox2d<'a>;

    #[inline]
    unsafe fn follow(buf: &'a [u8], loc: usize) -> Self::Inner {
        Self {
            _tab: Table::new(buf, loc),
        }
    }
}

impl<'a> BoundingBox2d<'a> {
    pub const VT_LEFT: VOffsetT = 4;
    pub const VT_TOP: VOffsetT = 6;
    pub const VT_RIGHT: VOffsetT = 8;
    pub const VT_BOTTOM: VOffsetT = 10;

    #[inline]
    fn coordinate(&self, slot: VOffsetT) -> i32 {
        // SAFETY: the buffer was verified by `root`
        unsafe { self._tab.get::<i32>(slot, Some(0)) }.unwrap_or(0)
    }

    pub fn left(&self) -> i32 {
        self.coordinate(Self::VT_LEFT)
    }

    pub fn top(&self) -> i32 {
        self.coordinate(Self::VT_TOP)
    }

    pub fn right(&self) -> i32 {
        self.coordinate(Self::VT_RIGHT)
    }

    pub fn bottom(&self) -> i32 {
        self.coordinate(Self::VT_BOTTOM)
    }
}

impl Verifiable for BoundingBox2d<'_> {
    #[inline]
    fn run_verifier(v: &mut Verifier, pos: usize) -> Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<i32>("left", Self::VT_LEFT, false)?
            .visit_field::<i32>("top", Self::VT_TOP, false)?
            .visit_field::<i32>("right", Self::VT_RIGHT, false)?
            .visit_field::<i32>("bottom", Self::VT_BOTTOM, false)?
            .finish();
        Ok(())
    }
}
