//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable key for a drawable in a [`RenderSet`](crate::scene::RenderSet).
    ///
    /// Keys are versioned: a key to a destroyed drawable never aliases a
    /// drawable created later in the same slot.
    pub struct DrawableKey;
}

/// Handle-based map of drawables
pub type DrawableMap<T> = SlotMap<DrawableKey, T>;
