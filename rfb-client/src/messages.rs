//! Application-facing message types for communication between the client and application.

use bytes::Bytes;
use rfb_common::Rect;
use rfb_protocol::messages::PixelFormat;

use crate::keymap::KeyTranslation;

/// Events sent from the VNC client to the application.
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// Successfully connected to the server.
    Connected {
        /// Framebuffer width in pixels.
        width: u16,
        /// Framebuffer height in pixels.
        height: u16,
        /// Server name/description.
        name: String,
        /// Negotiated pixel format.
        pixel_format: PixelFormat,
    },

    /// Framebuffer has been updated.
    ///
    /// The `damage` vector contains all rectangles that were updated.
    /// The application should redraw these regions.
    FramebufferUpdated {
        /// List of rectangles that were updated.
        damage: Vec<Rect>,
    },

    /// Server sent a bell notification.
    Bell,

    /// Server sent clipboard/cut text data.
    ServerCutText {
        /// Clipboard data (typically UTF-8 text).
        text: Bytes,
    },

    /// Connection has been closed (gracefully or due to error).
    ConnectionClosed,

    /// The session terminated with an error.
    ///
    /// This is always the last event the client sends; the event loop task
    /// exits immediately afterward.
    Error {
        /// The error message.
        message: String,
    },
}

/// Commands sent from the application to the VNC client.
#[derive(Debug, Clone)]
pub enum ClientCommand {
    /// Request a framebuffer update.
    RequestUpdate {
        /// If true, only send updates for changed regions.
        /// If false, send the entire specified rectangle.
        incremental: bool,
        /// Rectangle to update. If None, update the entire screen.
        rect: Option<Rect>,
    },

    /// Send pointer (mouse) event.
    Pointer {
        /// X coordinate in pixels.
        x: u16,
        /// Y coordinate in pixels.
        y: u16,
        /// Button mask (bit 0 = left, bit 1 = middle, bit 2 = right).
        buttons: u8,
    },

    /// Send keyboard event for a single already-resolved keysym.
    ///
    /// Use this for callers that only ever send bare keysyms. Callers whose
    /// host key codes need the modifier release/restore dance (§4.7, e.g.
    /// AltGr) should run their [`crate::keymap::Keymap`] and send
    /// [`ClientCommand::TranslatedKey`] instead.
    Key {
        /// X11 keysym value.
        key: u32,
        /// True if key was pressed, false if released.
        down: bool,
    },

    /// Send the keysym transaction produced by a [`crate::keymap::Keymap`]
    /// translation: modifiers are released, the keysym(s) sent, then the
    /// released modifiers restored, in that order.
    TranslatedKey(KeyTranslation),

    /// The host window lost input focus: release every modifier the session
    /// currently believes is held down, so a stuck key doesn't repeat into
    /// whatever gains focus next.
    FocusLost,

    /// Send clipboard/cut text to server.
    ClientCutText {
        /// Text data to send (typically UTF-8).
        text: Bytes,
    },

    /// Request a pixel format change, applied after the next framebuffer
    /// update finishes processing.
    ///
    /// Triggers the `Running -> Reconfiguring -> Running` transition: the
    /// client re-negotiates the pixel format (§4.2), sends `SetPixelFormat`
    /// and `SetEncodings` again, and requests a full update.
    ChangeFormat {
        /// Request the 8-bit BGR233 format instead of the negotiated default.
        use_8bit: bool,
    },

    /// Mark the session dormant (suppress update requests) or active again.
    ///
    /// While dormant, the client stops requesting framebuffer updates after
    /// each processed update, so the server stays quiescent until the
    /// application has somewhere to draw again (e.g. its window is
    /// minimized).
    SetDormant(bool),

    /// Close the connection.
    Close,
}
