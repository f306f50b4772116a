//! Event loop coordination: the reader/driver session loop (§4.6, §5).

use crate::{
    config::Config,
    connection,
    errors::RfbClientError,
    framebuffer::Framebuffer,
    keymap::ModifierTracker,
    messages::{ClientCommand, ServerEvent},
    protocol, FramebufferHandle,
};
use bytes::Bytes;
use rfb_protocol::messages::types::{PixelFormat as WirePixelFormat, Rectangle};
use rfb_protocol::messages::server::{Bell, ServerCutText};
use rfb_pixelbuffer::PixelFormat as LocalPixelFormat;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::select;
use tokio::task::JoinHandle;

/// Spawn the client event loop.
///
/// Establishes the connection, performs the handshake and initial pixel
/// format negotiation (§4.2/§4.5), creates the shared framebuffer, and
/// spawns the reader/driver session loop (§4.6). Returns both the join
/// handle and the shared framebuffer handle.
pub async fn spawn(
    config: Config,
    commands: flume::Receiver<ClientCommand>,
    events: flume::Sender<ServerEvent>,
) -> Result<(JoinHandle<()>, FramebufferHandle), RfbClientError> {
    let conn = connection::establish(&config).await?;
    let fb_width = conn.server_init.framebuffer_width;
    let fb_height = conn.server_init.framebuffer_height;
    let name = conn.server_init.name.clone();

    let mut input = conn.input;
    let mut output = conn.output;

    let chosen_format = choose_pixel_format(&conn.server_init.pixel_format, config.display.use_8bit);

    protocol::write_set_pixel_format(&mut output, chosen_format.clone()).await?;
    protocol::write_set_encodings(&mut output, config.effective_encodings()).await?;
    protocol::write_framebuffer_update_request(&mut output, false, 0, 0, fb_width, fb_height).await?;

    let framebuffer = Arc::new(tokio::sync::Mutex::new(Framebuffer::new(
        fb_width,
        fb_height,
        chosen_format.clone(),
    )));
    let framebuffer_handle = framebuffer.clone();

    let _ = events.send(ServerEvent::Connected {
        width: fb_width,
        height: fb_height,
        name,
        pixel_format: chosen_format,
    });

    let input_cfg = config.input.clone();
    let encodings_cfg = config.effective_encodings();

    let handle = tokio::spawn(async move {
        let mut dormant = false;
        let mut pending_format_change: Option<bool> = None;
        let mut modifiers = ModifierTracker::new();

        loop {
            select! {
                biased;

                res = protocol::read_message_type(&mut input) => {
                    let msg_type = match res {
                        Ok(t) => t,
                        Err(e) => {
                            terminate(&events, e).await;
                            break;
                        }
                    };

                    match msg_type {
                        0 => {
                            if let Err(e) = process_framebuffer_update(&mut input, &framebuffer, &events).await {
                                terminate(&events, e).await;
                                break;
                            }

                            if let Some(use_8bit) = pending_format_change.take() {
                                let current_format = framebuffer.lock().await.server_pixel_format();
                                let new_format = choose_pixel_format(&current_format, use_8bit);
                                if let Err(e) = protocol::write_set_pixel_format(&mut output, new_format.clone()).await {
                                    terminate(&events, e).await;
                                    break;
                                }
                                if let Err(e) = protocol::write_set_encodings(&mut output, encodings_cfg.clone()).await {
                                    terminate(&events, e).await;
                                    break;
                                }
                                framebuffer.lock().await.set_server_pixel_format(new_format);
                                if let Err(e) = protocol::write_framebuffer_update_request(
                                    &mut output, false, 0, 0, fb_width, fb_height,
                                ).await {
                                    terminate(&events, e).await;
                                    break;
                                }
                            } else if !dormant {
                                if let Err(e) = protocol::write_framebuffer_update_request(
                                    &mut output, true, 0, 0, fb_width, fb_height,
                                ).await {
                                    terminate(&events, e).await;
                                    break;
                                }
                            }
                        }
                        1 => {
                            terminate(
                                &events,
                                RfbClientError::Unsupported(
                                    "SetColourMapEntries: colour-mapped servers are not supported".into(),
                                ),
                            ).await;
                            break;
                        }
                        2 => {
                            if let Err(e) = Bell::read_from(&mut input).await {
                                terminate(&events, RfbClientError::TransportError(e)).await;
                                break;
                            }
                            let _ = events.send(ServerEvent::Bell);
                        }
                        3 => {
                            let cut = match ServerCutText::read_from(&mut input).await {
                                Ok(c) => c,
                                Err(e) => {
                                    terminate(&events, RfbClientError::TransportError(e)).await;
                                    break;
                                }
                            };
                            let _ = events.send(ServerEvent::ServerCutText {
                                text: Bytes::from(cut.text.into_bytes()),
                            });
                        }
                        other => {
                            terminate(
                                &events,
                                RfbClientError::Unsupported(format!(
                                    "unsupported server message type {other}"
                                )),
                            ).await;
                            break;
                        }
                    }
                }

                cmd = commands.recv_async() => {
                    let Ok(command) = cmd else {
                        let _ = events.send(ServerEvent::ConnectionClosed);
                        break;
                    };
                    if matches!(command, ClientCommand::Close) {
                        let _ = events.send(ServerEvent::ConnectionClosed);
                        break;
                    }
                    if let Err(e) = handle_command(
                        &mut output,
                        command,
                        &input_cfg,
                        fb_width,
                        fb_height,
                        &mut dormant,
                        &mut pending_format_change,
                        &mut modifiers,
                    ).await {
                        terminate(&events, e).await;
                        break;
                    }
                }
            }
        }
    });

    Ok((handle, framebuffer_handle))
}

/// Reads one `FramebufferUpdate` message (header + all rectangles).
///
/// Each rectangle is decoded under its own framebuffer lock acquisition, and
/// the pixel buffer's damage is drained and forwarded to the event channel
/// immediately after that single rectangle is applied. This keeps the lock a
/// rectangle-sized critical section and notifies the frame sink after each
/// rectangle rather than batching the whole update (§4.3, §5).
async fn process_framebuffer_update<R: AsyncRead + Unpin>(
    input: &mut rfb_protocol::io::RfbInStream<R>,
    framebuffer: &FramebufferHandle,
    events: &flume::Sender<ServerEvent>,
) -> Result<(), RfbClientError> {
    let num_rects = protocol::read_framebuffer_update_header(input).await?;

    tracing::debug!(
        target: "rfb_client::framing",
        "FBU start: declared_rects={}",
        num_rects
    );

    for i in 0..num_rects {
        let rect = Rectangle::read_from(input).await.map_err(|e| {
            RfbClientError::ProtocolParseError(format!("failed to read Rectangle header: {e}"))
        })?;

        tracing::debug!(
            target: "rfb_client::framing",
            "FBU rect {}/{}: enc={} rect=[{},{} {}x{}]",
            i, num_rects, rect.encoding, rect.x, rect.y, rect.width, rect.height
        );

        let damage = {
            let mut fb = framebuffer.lock().await;
            fb.apply_rectangle(input, &rect).await?;
            fb.take_damage()
        };

        if let Some(d) = damage {
            let _ = events.send(ServerEvent::FramebufferUpdated { damage: vec![d] });
        }
    }

    tracing::debug!(target: "rfb_client::framing", "FBU end: rects_decoded={}", num_rects);

    Ok(())
}

/// Emit the terminal `Error` then `ConnectionClosed` events for a session-ending error.
async fn terminate(events: &flume::Sender<ServerEvent>, err: RfbClientError) {
    let _ = events.send(ServerEvent::Error { message: err.to_string() });
    let _ = events.send(ServerEvent::ConnectionClosed);
}

/// Chooses the pixel format to negotiate with the server (§4.2):
/// - `use_8bit` requests the 8bpp `BGR233` format outright.
/// - A non-true-color server format is upgraded to 16bpp `RGB565`.
/// - A true-color server format with `bpp >= 8` is adopted as-is.
/// - Anything else (e.g. a true-color format under 8bpp) falls back to `RGB565`.
///
/// The result always has `big_endian = 0` per §4.5 step 5.
fn choose_pixel_format(server_pf: &WirePixelFormat, use_8bit: bool) -> WirePixelFormat {
    let chosen: LocalPixelFormat = if use_8bit {
        LocalPixelFormat::bgr233()
    } else if server_pf.true_color == 0 {
        LocalPixelFormat::rgb565()
    } else if server_pf.bits_per_pixel >= 8 {
        LocalPixelFormat::from(server_pf.clone())
    } else {
        LocalPixelFormat::rgb565()
    };

    let mut wire: WirePixelFormat = chosen.into();
    wire.big_endian = 0;
    wire
}

/// Swaps the middle/right mouse button bits (bit 1 and bit 2) when requested.
fn swap_buttons(buttons: u8) -> u8 {
    let middle = (buttons >> 1) & 1;
    let right = (buttons >> 2) & 1;
    (buttons & !0b110) | (middle << 2) | (right << 1)
}

#[allow(clippy::too_many_arguments)]
async fn handle_command<W: tokio::io::AsyncWrite + Unpin>(
    output: &mut rfb_protocol::io::RfbOutStream<W>,
    command: ClientCommand,
    input_cfg: &crate::config::InputConfig,
    fb_width: u16,
    fb_height: u16,
    dormant: &mut bool,
    pending_format_change: &mut Option<bool>,
    modifiers: &mut ModifierTracker,
) -> Result<(), RfbClientError> {
    match command {
        ClientCommand::RequestUpdate { incremental, rect } => {
            let (x, y, w, h) = match rect {
                Some(r) => (r.x as u16, r.y as u16, r.width as u16, r.height as u16),
                None => (0, 0, fb_width, fb_height),
            };
            protocol::write_framebuffer_update_request(output, incremental, x, y, w, h).await?;
        }
        ClientCommand::Pointer { x, y, buttons } => {
            if input_cfg.view_only {
                return Ok(());
            }
            let buttons = if input_cfg.swap_mouse {
                swap_buttons(buttons)
            } else {
                buttons
            };
            protocol::write_pointer_event(output, buttons, x, y).await?;
        }
        ClientCommand::Key { key, down } => {
            if input_cfg.view_only {
                return Ok(());
            }
            protocol::write_key_event(output, key, down).await?;
            modifiers.observe(key, down);
        }
        ClientCommand::TranslatedKey(translation) => {
            if input_cfg.view_only {
                return Ok(());
            }
            for &m in &translation.modifiers_to_release {
                protocol::write_key_event(output, m, false).await?;
                modifiers.observe(m, false);
            }
            for (keysym, down) in translation.keysyms {
                protocol::write_key_event(output, keysym, down).await?;
                modifiers.observe(keysym, down);
            }
            for &m in &translation.modifiers_to_restore {
                protocol::write_key_event(output, m, true).await?;
                modifiers.observe(m, true);
            }
        }
        ClientCommand::FocusLost => {
            for keysym in modifiers.release_all() {
                protocol::write_key_event(output, keysym, false).await?;
            }
        }
        ClientCommand::ClientCutText { text } => {
            if input_cfg.view_only {
                return Ok(());
            }
            let s = String::from_utf8_lossy(&text).to_string();
            protocol::write_client_cut_text(output, &s).await?;
        }
        ClientCommand::ChangeFormat { use_8bit } => {
            *pending_format_change = Some(use_8bit);
        }
        ClientCommand::SetDormant(value) => {
            *dormant = value;
        }
        ClientCommand::Close => unreachable!("Close is handled by the caller before dispatch"),
    }
    Ok(())
}
