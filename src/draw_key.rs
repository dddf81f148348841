//! Bit-packed render-state sort key.
//!
//! A [`DrawKey`] packs every render-state selector of a draw item into one
//! `u64`. Equal keys can share a GPU draw call; ordering by the raw integer
//! clusters identical state together. Fields are laid out from least to most
//! significant in [`KeyField::ALL`] order, so later fields dominate comparisons:
//! transparency first, then geometry layout, then clip region, and so on down
//! to primitive kind.
//!
//! | field | bits | offset |
//! |---|---|---|
//! | primitive | 3 | 0 |
//! | uniform set | 6 | 3 |
//! | texture set | 9 | 9 |
//! | stencil | 4 | 18 |
//! | blend | 6 | 22 |
//! | depth | 4 | 28 |
//! | shader | 5 | 32 |
//! | clip | 8 | 37 |
//! | geometry layout | 6 | 45 |
//! | transparency | 1 | 51 |

use std::fmt;

/// One bit field of a [`DrawKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyField {
    Primitive,
    UniformSet,
    TextureSet,
    Stencil,
    Blend,
    Depth,
    Shader,
    Clip,
    GeometryLayout,
    Transparency,
}

const WIDTHS: [u32; 10] = [3, 6, 9, 4, 6, 4, 5, 8, 6, 1];

const fn offsets() -> [u32; 10] {
    let mut out = [0u32; 10];
    let mut i = 1;
    while i < WIDTHS.len() {
        out[i] = out[i - 1] + WIDTHS[i - 1];
        i += 1;
    }
    out
}

const OFFSETS: [u32; 10] = offsets();

/// Total number of bits used by a key.
pub const KEY_BITS: u32 = OFFSETS[9] + WIDTHS[9];

const _: () = assert!(KEY_BITS <= 52);

impl KeyField {
    /// Fields from least to most significant.
    pub const ALL: [KeyField; 10] = [
        KeyField::Primitive,
        KeyField::UniformSet,
        KeyField::TextureSet,
        KeyField::Stencil,
        KeyField::Blend,
        KeyField::Depth,
        KeyField::Shader,
        KeyField::Clip,
        KeyField::GeometryLayout,
        KeyField::Transparency,
    ];

    pub const fn width(self) -> u32 {
        WIDTHS[self as usize]
    }

    pub const fn offset(self) -> u32 {
        OFFSETS[self as usize]
    }

    /// Number of distinct ids the field can hold.
    pub const fn capacity(self) -> usize {
        1 << self.width()
    }

    pub const fn max_value(self) -> u64 {
        (1 << self.width()) - 1
    }

    const fn mask(self) -> u64 {
        self.max_value() << self.offset()
    }
}

/// Packed render-state key. See the module docs for the layout.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DrawKey(u64);

impl DrawKey {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    pub fn get(self, field: KeyField) -> u64 {
        (self.0 & field.mask()) >> field.offset()
    }

    /// Set `field` to `id`, leaving every other field untouched.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not fit the field's bit width. Ids come from the
    /// bounded registries in [`crate::registry`], so this only fires on a
    /// hand-built id.
    pub fn set(&mut self, field: KeyField, id: u64) {
        assert!(
            id <= field.max_value(),
            "draw key field {:?} holds at most {}, got {}",
            field,
            field.max_value(),
            id
        );
        self.0 = (self.0 & !field.mask()) | ((id << field.offset()) & field.mask());
    }

    /// Non-panicking [`set`](Self::set). Returns `None` if `id` is out of range.
    pub fn try_set(self, field: KeyField, id: u64) -> Option<Self> {
        if id > field.max_value() {
            return None;
        }
        let mut key = self;
        key.set(field, id);
        Some(key)
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, field: KeyField, id: u64) -> Self {
        self.set(field, id);
        self
    }

    pub fn primitive(self) -> u8 {
        self.get(KeyField::Primitive) as u8
    }

    pub fn uniform_set(self) -> u8 {
        self.get(KeyField::UniformSet) as u8
    }

    pub fn texture_set(self) -> u16 {
        self.get(KeyField::TextureSet) as u16
    }

    pub fn stencil(self) -> u8 {
        self.get(KeyField::Stencil) as u8
    }

    pub fn blend(self) -> u8 {
        self.get(KeyField::Blend) as u8
    }

    pub fn depth(self) -> u8 {
        self.get(KeyField::Depth) as u8
    }

    pub fn shader(self) -> u8 {
        self.get(KeyField::Shader) as u8
    }

    pub fn clip(self) -> u8 {
        self.get(KeyField::Clip) as u8
    }

    pub fn geometry_layout(self) -> u8 {
        self.get(KeyField::GeometryLayout) as u8
    }

    pub fn is_transparent(self) -> bool {
        self.get(KeyField::Transparency) != 0
    }

    pub fn set_clip(&mut self, clip_id: u8) {
        self.set(KeyField::Clip, clip_id as u64);
    }

    pub fn set_transparent(&mut self, transparent: bool) {
        self.set(KeyField::Transparency, transparent as u64);
    }
}

impl fmt::Debug for DrawKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawKey")
            .field("transparent", &self.is_transparent())
            .field("geometry_layout", &self.geometry_layout())
            .field("clip", &self.clip())
            .field("shader", &self.shader())
            .field("depth", &self.depth())
            .field("blend", &self.blend())
            .field("stencil", &self.stencil())
            .field("texture_set", &self.texture_set())
            .field("uniform_set", &self.uniform_set())
            .field("primitive", &self.primitive())
            .finish()
    }
}
