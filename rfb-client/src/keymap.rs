//! Host virtual-key to RFB keysym translation (§4.7).
//!
//! The wire protocol only ever carries X11 keysyms; how a host key code and
//! its modifier state map onto them is inherently platform-specific (X11
//! keycodes, Windows virtual-key codes, macOS key codes all differ), so the
//! mapping table itself belongs to the host, not this crate. What the core
//! *does* own is the transient modifier dance described in §4.7: some host
//! key combinations (AltGr on many European layouts is the classic case) are
//! delivered to the host as `Control+Alt+X`, but must reach the server as a
//! bare keysym — sending Control and Alt down first would make the server
//! see a chord the user never intended. The [`Keymap`] trait lets a host
//! implementation flag which modifiers must be transiently released before a
//! keysym and restored after, and the session applies that transaction
//! atomically against its tracked modifier state.

use std::collections::HashSet;

/// X11 keysym values for the small set of modifier keys this crate
/// transiently releases/restores. Mirrors the constants an X11-facing host
/// keymap would already have on hand.
pub mod keysyms {
    /// Left Shift.
    pub const XK_SHIFT_L: u32 = 0xffe1;
    /// Right Shift.
    pub const XK_SHIFT_R: u32 = 0xffe2;
    /// Left Control.
    pub const XK_CONTROL_L: u32 = 0xffe3;
    /// Right Control.
    pub const XK_CONTROL_R: u32 = 0xffe4;
    /// Left Alt.
    pub const XK_ALT_L: u32 = 0xffe9;
    /// Right Alt (commonly "AltGr" on European layouts).
    pub const XK_ALT_R: u32 = 0xffea;
    /// Left Super/Windows/Command key.
    pub const XK_SUPER_L: u32 = 0xffeb;
    /// Right Super/Windows/Command key.
    pub const XK_SUPER_R: u32 = 0xffec;
}

/// Bitmask of modifier keys currently held down on the host, as observed at
/// the moment a key event is translated. Hosts fill this in from their own
/// notion of modifier state (e.g. a winit `ModifiersState`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierFlags(u8);

impl ModifierFlags {
    /// Shift is held.
    pub const SHIFT: ModifierFlags = ModifierFlags(1 << 0);
    /// Control is held.
    pub const CONTROL: ModifierFlags = ModifierFlags(1 << 1);
    /// Alt is held.
    pub const ALT: ModifierFlags = ModifierFlags(1 << 2);
    /// Super/Windows/Command is held.
    pub const SUPER: ModifierFlags = ModifierFlags(1 << 3);
    /// AltGr is held (reported distinctly from Control+Alt on hosts that can tell them apart).
    pub const ALT_GR: ModifierFlags = ModifierFlags(1 << 4);

    /// The empty set: no modifiers held.
    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    /// Returns the union of `self` and `other`.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns whether `self` contains every bit set in `other`.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for ModifierFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// The result of translating one host key event.
///
/// `modifiers_to_release` must be sent (as key-up) before `keysyms`;
/// `modifiers_to_restore` must be sent (as key-down) after, to undo the
/// transient release. Most translations produce an empty release/restore
/// set — it exists only for combinations like AltGr that are encoded by the
/// host as a chord of other modifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyTranslation {
    /// Keysyms to release (key-up) before sending `keysyms`.
    pub modifiers_to_release: Vec<u32>,
    /// The keysym/down-state pairs produced by this host event, in order.
    pub keysyms: Vec<(u32, bool)>,
    /// Keysyms to restore (key-down) after sending `keysyms`.
    pub modifiers_to_restore: Vec<u32>,
}

impl KeyTranslation {
    /// A translation that passes a single keysym through with no modifier juggling.
    #[must_use]
    pub fn plain(keysym: u32, down: bool) -> Self {
        Self {
            modifiers_to_release: Vec::new(),
            keysyms: vec![(keysym, down)],
            modifiers_to_restore: Vec::new(),
        }
    }
}

/// Translates a host virtual key code, in a given modifier context, into the
/// RFB keysym transaction described above.
///
/// Implementations own the host-specific virtual-key table; this crate only
/// consumes the resulting `KeyTranslation`.
pub trait Keymap: Send {
    /// Translate one host key event.
    fn translate(&mut self, vk: u32, down: bool, modifiers: ModifierFlags) -> KeyTranslation;
}

/// A [`Keymap`] that treats `vk` as an X11 keysym already and applies only
/// the AltGr transient-release rule from §4.7.
///
/// Suitable for hosts (or tests) that hand the session X11 keysyms directly,
/// or as the reference implementation of the release/restore contract other
/// keymaps should follow.
#[derive(Debug, Default)]
pub struct PassthroughKeymap;

impl Keymap for PassthroughKeymap {
    fn translate(&mut self, vk: u32, down: bool, modifiers: ModifierFlags) -> KeyTranslation {
        // AltGr delivered to the host as Ctrl+Alt must not reach the server
        // as that chord: release both before the key, restore after.
        if down && modifiers.contains(ModifierFlags::ALT_GR | ModifierFlags::CONTROL) {
            return KeyTranslation {
                modifiers_to_release: vec![keysyms::XK_CONTROL_L, keysyms::XK_ALT_L],
                keysyms: vec![(vk, true)],
                modifiers_to_restore: vec![keysyms::XK_CONTROL_L, keysyms::XK_ALT_L],
            };
        }
        KeyTranslation::plain(vk, down)
    }
}

/// Tracks which modifier keysyms are currently believed to be held down on
/// the server side, so a focus-loss notification can release exactly those.
#[derive(Debug, Default)]
pub struct ModifierTracker {
    held: HashSet<u32>,
}

impl ModifierTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the effect of sending one `(keysym, down)` pair.
    pub fn observe(&mut self, keysym: u32, down: bool) {
        if down {
            self.held.insert(keysym);
        } else {
            self.held.remove(&keysym);
        }
    }

    /// Returns the keysyms to release on focus loss, draining the tracked set.
    pub fn release_all(&mut self) -> Vec<u32> {
        self.held.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_translation_has_no_modifier_juggling() {
        let mut km = PassthroughKeymap;
        let t = km.translate('a' as u32, true, ModifierFlags::empty());
        assert!(t.modifiers_to_release.is_empty());
        assert!(t.modifiers_to_restore.is_empty());
        assert_eq!(t.keysyms, vec![('a' as u32, true)]);
    }

    #[test]
    fn altgr_releases_and_restores_ctrl_alt() {
        let mut km = PassthroughKeymap;
        let mods = ModifierFlags::ALT_GR | ModifierFlags::CONTROL;
        let t = km.translate('{' as u32, true, mods);
        assert_eq!(
            t.modifiers_to_release,
            vec![keysyms::XK_CONTROL_L, keysyms::XK_ALT_L]
        );
        assert_eq!(t.keysyms, vec![('{' as u32, true)]);
        assert_eq!(
            t.modifiers_to_restore,
            vec![keysyms::XK_CONTROL_L, keysyms::XK_ALT_L]
        );
    }

    #[test]
    fn key_up_does_not_trigger_altgr_handling() {
        let mut km = PassthroughKeymap;
        let mods = ModifierFlags::ALT_GR | ModifierFlags::CONTROL;
        let t = km.translate('{' as u32, false, mods);
        assert!(t.modifiers_to_release.is_empty());
        assert!(t.modifiers_to_restore.is_empty());
    }

    #[test]
    fn modifier_tracker_release_all_drains() {
        let mut tracker = ModifierTracker::new();
        tracker.observe(keysyms::XK_CONTROL_L, true);
        tracker.observe(keysyms::XK_SHIFT_L, true);
        tracker.observe(keysyms::XK_CONTROL_L, false);

        let mut released = tracker.release_all();
        released.sort_unstable();
        assert_eq!(released, vec![keysyms::XK_SHIFT_L]);
        assert!(tracker.release_all().is_empty());
    }

    #[test]
    fn modifier_flags_union_and_contains() {
        let both = ModifierFlags::SHIFT | ModifierFlags::CONTROL;
        assert!(both.contains(ModifierFlags::SHIFT));
        assert!(both.contains(ModifierFlags::CONTROL));
        assert!(!both.contains(ModifierFlags::ALT));
    }
}
