use eframe::egui;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use agent_host::prompts;
use shared::catalog::{enabled_models, filter_models, format_pricing};
use shared::conversation::{Message, Role};
use shared::events::UiCommand;
use shared::settings::{SearchEngine, Settings, SystemPromptMode, Theme, DEFAULT_PROMPT_ID};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod simple_md;
mod state;
mod types;

use types::{MessageAction, UiState};

fn try_read_clipboard_text() -> Option<String> {
    let mut clipboard = arboard::Clipboard::new().ok()?;
    let text = clipboard.get_text().ok()?;
    let trimmed = text.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Text to search for from a message: whatever was last copied, else the
/// message's first non-empty line.
fn selection_text(msg: &Message) -> String {
    try_read_clipboard_text().unwrap_or_else(|| {
        msg.content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .to_string()
    })
}

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([800.0, 600.0]),
        vsync: true,
        ..Default::default()
    };
    eframe::run_native(
        "LLM UI",
        options,
        Box::new(|_cc| {
            Box::new(LlmUiApp {
                state: Arc::new(Mutex::new(UiState::new())),
            })
        }),
    )
}

struct LlmUiApp {
    state: Arc<Mutex<UiState>>,
}

impl eframe::App for LlmUiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut s = self.state.lock();

        // Poll background work (non-blocking)
        s.poll_stream();
        s.poll_models();
        if s.stream_rx.is_some() || s.models_rx.is_some() {
            ctx.request_repaint_after(Duration::from_millis(50));
        }

        apply_style(ctx, s.settings());
        let dark = s.settings().theme == Theme::Dark;

        render_sidebar(&mut s, ctx, dark);
        render_header(&mut s, ctx, dark);
        render_input(&mut s, ctx, dark);
        render_transcript(&mut s, ctx, dark);
        render_settings_window(&mut s, ctx);
    }
}

fn apply_style(ctx: &egui::Context, settings: &Settings) {
    let mut style = (*ctx.style()).clone();
    style.visuals = match settings.theme {
        Theme::Dark => egui::Visuals::dark(),
        Theme::Light => egui::Visuals::light(),
    };
    let size = settings.font_size as f32;
    style
        .text_styles
        .insert(egui::TextStyle::Body, egui::FontId::proportional(size));
    style
        .text_styles
        .insert(egui::TextStyle::Button, egui::FontId::proportional(size - 1.0));
    style
        .text_styles
        .insert(egui::TextStyle::Heading, egui::FontId::proportional(size + 6.0));
    ctx.set_style(style);
}

fn muted(dark: bool) -> egui::Color32 {
    if dark {
        egui::Color32::from_rgb(150, 150, 165)
    } else {
        egui::Color32::from_rgb(110, 110, 125)
    }
}

fn render_sidebar(s: &mut UiState, ctx: &egui::Context, dark: bool) {
    if !s.settings().sidebar_visible {
        return;
    }
    let width = s.settings().sidebar_width;

    let panel = egui::SidePanel::left("conversations")
        .resizable(true)
        .default_width(width)
        .show(ctx, |ui| {
            ui.add_space(10.0);
            ui.horizontal(|ui| {
                ui.heading("Conversations");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("+ New").on_hover_text("Start a new conversation").clicked() {
                        s.dispatch(UiCommand::NewConversation);
                    }
                });
            });
            ui.add_space(6.0);

            let search = ui.add(
                egui::TextEdit::singleline(&mut s.search_text)
                    .hint_text("Search conversations")
                    .desired_width(f32::INFINITY),
            );
            if search.changed() {
                let query = s.search_text.clone();
                s.dispatch(UiCommand::SetSearchQuery(query));
            }
            ui.separator();

            let current_id = s.controller.state().current.id.clone();
            let rows = s.controller.summaries();
            let mut open = None;
            let mut delete = None;

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    if rows.is_empty() {
                        ui.label(egui::RichText::new("No saved conversations").weak());
                    }
                    for row in &rows {
                        let selected = row.id == current_id;
                        let fill = match (selected, dark) {
                            (true, true) => egui::Color32::from_rgb(55, 60, 75),
                            (true, false) => egui::Color32::from_rgb(220, 228, 240),
                            (false, _) => egui::Color32::TRANSPARENT,
                        };
                        egui::Frame::none()
                            .fill(fill)
                            .rounding(egui::Rounding::same(8.0))
                            .inner_margin(egui::Margin::same(6.0))
                            .show(ui, |ui| {
                                ui.horizontal(|ui| {
                                    let title = egui::RichText::new(&row.title).strong();
                                    if ui.selectable_label(selected, title).clicked() {
                                        open = Some(row.id.clone());
                                    }
                                    ui.with_layout(
                                        egui::Layout::right_to_left(egui::Align::Center),
                                        |ui| {
                                            if ui
                                                .small_button("🗑")
                                                .on_hover_text("Delete conversation")
                                                .clicked()
                                            {
                                                delete = Some(row.id.clone());
                                            }
                                        },
                                    );
                                });
                                if !row.preview.is_empty() {
                                    ui.label(
                                        egui::RichText::new(&row.preview)
                                            .small()
                                            .color(muted(dark)),
                                    );
                                }
                                ui.label(
                                    egui::RichText::new(format!(
                                        "{} · {} messages · ${:.4}",
                                        row.created_at
                                            .with_timezone(&chrono::Local)
                                            .format("%Y-%m-%d %H:%M"),
                                        row.message_count,
                                        row.total_cost
                                    ))
                                    .small()
                                    .color(muted(dark)),
                                );
                            });
                        ui.add_space(2.0);
                    }
                });

            if let Some(id) = open {
                s.dispatch(UiCommand::OpenConversation(id));
            }
            if let Some(id) = delete {
                s.dispatch(UiCommand::DeleteConversation(id));
            }
        });

    // Persist the width once a resize drag has finished.
    let dragging = ctx.input(|i| i.pointer.any_down());
    let shown = panel.response.rect.width();
    if !dragging && (shown - width).abs() >= 1.0 {
        s.resize_sidebar(shown);
    }
}

fn render_header(s: &mut UiState, ctx: &egui::Context, dark: bool) {
    egui::TopBottomPanel::top("header")
        .frame(
            egui::Frame::none()
                .fill(if dark {
                    egui::Color32::from_rgb(35, 35, 42)
                } else {
                    egui::Color32::from_rgb(245, 247, 250)
                })
                .inner_margin(egui::Margin::symmetric(12.0, 8.0)),
        )
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("☰").on_hover_text("Toggle sidebar").clicked() {
                    s.toggle_sidebar();
                }
                let title = s.controller.state().current.title.clone();
                ui.heading(title);
                ui.add_space(16.0);
                model_picker(ui, s);
                prompt_picker(ui, s);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("⚙ Settings").clicked() {
                        s.open_settings();
                    }
                    if ui.button("Import").on_hover_text("Import a conversation file").clicked() {
                        s.import_conversation();
                    }
                    if ui.button("Export").on_hover_text("Export this conversation").clicked() {
                        s.export_conversation();
                    }
                    if !s.settings().auto_save && ui.button("Save").clicked() {
                        s.dispatch(UiCommand::SaveConversation);
                    }
                    let cost = s.controller.state().current.total_cost();
                    ui.label(
                        egui::RichText::new(format!("${:.4}", cost))
                            .monospace()
                            .color(muted(dark)),
                    )
                    .on_hover_text("Total cost of this conversation");
                });
            });
        });
}

fn model_picker(ui: &mut egui::Ui, s: &mut UiState) {
    let state = s.controller.state();
    let current = state.current.model.clone();
    let enabled = enabled_models(&state.models, &state.settings.selected_models);
    let choices: Vec<(String, String)> = if enabled.is_empty() {
        state.models.iter().map(|m| (m.id.clone(), m.label())).collect()
    } else {
        enabled.iter().map(|m| (m.id.clone(), m.label())).collect()
    };
    let selected_text = choices
        .iter()
        .find(|(id, _)| *id == current)
        .map(|(_, label)| label.clone())
        .unwrap_or_else(|| current.clone());

    if choices.is_empty() && s.models_rx.is_some() {
        ui.spinner();
        ui.label(egui::RichText::new("Loading models...").weak());
        return;
    }

    let mut picked = None;
    egui::ComboBox::from_id_source("model_picker")
        .width(280.0)
        .selected_text(selected_text)
        .show_ui(ui, |ui| {
            for (id, label) in &choices {
                if ui.selectable_label(*id == current, label).clicked() {
                    picked = Some(id.clone());
                }
            }
        });
    if let Some(id) = picked {
        s.dispatch(UiCommand::SelectModel(id));
    }
}

fn prompt_picker(ui: &mut egui::Ui, s: &mut UiState) {
    let settings = s.settings();
    let choices: Vec<(String, String)> = settings
        .system_prompts
        .iter()
        .map(|p| (p.id.clone(), p.name.clone()))
        .collect();
    let active = settings.active_system_prompt_id.clone().unwrap_or_default();
    let selected_text = settings
        .active_prompt()
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "No system prompt".to_string());

    let mut picked = None;
    egui::ComboBox::from_id_source("prompt_picker")
        .width(180.0)
        .selected_text(selected_text)
        .show_ui(ui, |ui| {
            for (id, name) in &choices {
                if ui.selectable_label(*id == active, name).clicked() {
                    picked = Some(id.clone());
                }
            }
        });
    if let Some(id) = picked {
        s.dispatch(UiCommand::SelectSystemPrompt(id));
    }
}

fn render_input(s: &mut UiState, ctx: &egui::Context, dark: bool) {
    egui::TopBottomPanel::bottom("input")
        .frame(
            egui::Frame::none()
                .fill(if dark {
                    egui::Color32::from_rgb(35, 35, 42)
                } else {
                    egui::Color32::from_rgb(245, 247, 250)
                })
                .inner_margin(egui::Margin::symmetric(12.0, 10.0)),
        )
        .show(ctx, |ui| {
            if let Some(status) = &s.controller.state().status {
                ui.label(
                    egui::RichText::new(status)
                        .small()
                        .color(egui::Color32::from_rgb(200, 120, 60)),
                );
                ui.add_space(4.0);
            }

            let streaming = s.is_streaming();
            ui.horizontal(|ui| {
                let hint = if s.settings().effective_api_key().is_some() {
                    "Type a message and press Enter"
                } else {
                    "Add your OpenRouter API key in Settings to start"
                };
                let response = ui.add_sized(
                    [ui.available_width() - 80.0, 40.0],
                    egui::TextEdit::singleline(&mut s.input_text).hint_text(hint),
                );
                if !streaming
                    && response.lost_focus()
                    && ui.input(|i| i.key_pressed(egui::Key::Enter))
                {
                    s.send_input();
                    response.request_focus();
                }

                let btn = if streaming {
                    egui::Button::new("Stop").fill(egui::Color32::from_rgb(180, 80, 80))
                } else {
                    egui::Button::new("Send").fill(egui::Color32::from_rgb(70, 130, 180))
                };
                if ui.add_sized([70.0, 40.0], btn).clicked() {
                    if streaming {
                        s.dispatch(UiCommand::StopGeneration);
                    } else {
                        s.send_input();
                    }
                }
            });
        });
}

fn render_transcript(s: &mut UiState, ctx: &egui::Context, dark: bool) {
    let size = s.settings().font_size as f32;
    let engine = s.settings().search_engine.display_name();
    let mut action = None;

    egui::CentralPanel::default().show(ctx, |ui| {
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let state = s.controller.state();
                if state.current.messages.is_empty() && state.streaming.is_none() {
                    ui.add_space(40.0);
                    ui.vertical_centered(|ui| {
                        ui.heading("Start a conversation");
                        ui.label(
                            egui::RichText::new(format!("Model: {}", state.current.model))
                                .color(muted(dark)),
                        );
                    });
                }
                for (index, msg) in state.current.messages.iter().enumerate() {
                    if let Some(a) = render_message(ui, index, msg, dark, size, engine) {
                        action = Some(a);
                    }
                    ui.add_space(8.0);
                }
                if let Some(in_flight) = &state.streaming {
                    render_streaming(ui, &in_flight.partial, in_flight.cost_estimate, dark, size);
                }
            });
    });

    if let Some(action) = action {
        s.apply_message_action(action);
    }
}

fn render_message(
    ui: &mut egui::Ui,
    index: usize,
    msg: &Message,
    dark: bool,
    size: f32,
    engine: &str,
) -> Option<MessageAction> {
    let mut action = None;
    let text_color = if dark {
        egui::Color32::from_rgb(220, 220, 230)
    } else {
        egui::Color32::from_rgb(40, 40, 50)
    };

    let fill = match msg.role {
        Role::User => egui::Color32::from_rgb(70, 130, 180),
        Role::Assistant if dark => egui::Color32::from_rgb(50, 50, 58),
        Role::Assistant => egui::Color32::from_rgb(245, 245, 248),
        Role::System if dark => egui::Color32::from_rgb(70, 55, 40),
        Role::System => egui::Color32::from_rgb(255, 243, 224),
    };
    // Hidden turns stay readable but faded.
    let dimmed = msg.hidden_from_llm && msg.role != Role::System;
    let mut frame = egui::Frame::none()
        .fill(if dimmed { fill.linear_multiply(0.45) } else { fill })
        .rounding(egui::Rounding::same(12.0))
        .inner_margin(egui::Margin::same(12.0));
    if msg.role == Role::System {
        frame = frame.stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(200, 140, 60)));
    }

    let layout = if msg.role == Role::User {
        egui::Layout::right_to_left(egui::Align::Min)
    } else {
        egui::Layout::left_to_right(egui::Align::Min)
    };

    ui.with_layout(layout, |ui| {
        let response = frame
            .show(ui, |ui| {
                ui.set_max_width(620.0);
                ui.vertical(|ui| {
                    match msg.role {
                        Role::User => {
                            ui.label(
                                egui::RichText::new(&msg.content)
                                    .color(egui::Color32::WHITE)
                                    .size(size),
                            );
                        }
                        Role::Assistant => {
                            simple_md::render_markdown(ui, &msg.content, text_color, size);
                        }
                        Role::System => {
                            ui.label(egui::RichText::new(&msg.content).color(text_color).size(size));
                        }
                    }

                    ui.add_space(6.0);
                    ui.horizontal_wrapped(|ui| {
                        let meta = message_meta(msg);
                        if !meta.is_empty() {
                            ui.label(egui::RichText::new(meta).small().color(muted(dark)));
                        }
                        if dimmed {
                            ui.label(
                                egui::RichText::new("hidden from model")
                                    .small()
                                    .italics()
                                    .color(muted(dark)),
                            );
                        }
                        if ui.small_button("Copy").on_hover_text("Copy to clipboard").clicked() {
                            ui.output_mut(|o| o.copied_text = msg.content.clone());
                        }
                        if msg.role != Role::System {
                            let label = if msg.hidden_from_llm { "Show" } else { "Hide" };
                            if ui
                                .small_button(label)
                                .on_hover_text("Include or exclude this message from the model's context")
                                .clicked()
                            {
                                action = Some(MessageAction::ToggleHidden(index));
                            }
                        }
                        if ui.small_button("Delete").clicked() {
                            action = Some(MessageAction::Delete(index));
                        }
                    });
                });
            })
            .response;

        response.context_menu(|ui| {
            if ui.button(format!("Search {} for copied text", engine)).clicked() {
                action = Some(MessageAction::Search {
                    text: selection_text(msg),
                    wikipedia: false,
                });
                ui.close_menu();
            }
            if ui.button("Look up copied text on Wikipedia").clicked() {
                action = Some(MessageAction::Search {
                    text: selection_text(msg),
                    wikipedia: true,
                });
                ui.close_menu();
            }
        });
    });

    action
}

fn message_meta(msg: &Message) -> String {
    let mut parts = Vec::new();
    if let Some(name) = msg.model_name.as_ref().or(msg.model_id.as_ref()) {
        parts.push(name.clone());
    }
    if let Some(usage) = &msg.usage {
        parts.push(format!(
            "{} in / {} out tokens",
            usage.prompt_tokens, usage.completion_tokens
        ));
    }
    if let Some(cost) = msg.cost {
        parts.push(format!("${:.6}", cost));
    }
    parts.join(" · ")
}

fn render_streaming(
    ui: &mut egui::Ui,
    partial: &str,
    cost_estimate: Option<f64>,
    dark: bool,
    size: f32,
) {
    let text_color = if dark {
        egui::Color32::from_rgb(220, 220, 230)
    } else {
        egui::Color32::from_rgb(40, 40, 50)
    };
    egui::Frame::none()
        .fill(if dark {
            egui::Color32::from_rgb(50, 50, 58)
        } else {
            egui::Color32::from_rgb(245, 245, 248)
        })
        .rounding(egui::Rounding::same(12.0))
        .inner_margin(egui::Margin::same(12.0))
        .show(ui, |ui| {
            ui.set_max_width(620.0);
            if partial.is_empty() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(egui::RichText::new("Thinking...").color(muted(dark)));
                });
            } else {
                simple_md::render_markdown(ui, partial, text_color, size);
                ui.spinner();
            }
            if let Some(cost) = cost_estimate {
                ui.label(
                    egui::RichText::new(format!("~${:.6}", cost))
                        .small()
                        .color(muted(dark)),
                );
            }
        });
}

enum PromptEdit {
    Rename(String, String),
    Content(String, String),
    MakeDefault(String),
    Delete(String),
    Add,
}

fn render_settings_window(s: &mut UiState, ctx: &egui::Context) {
    if !s.show_settings {
        return;
    }
    let mut open = true;
    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        open = false;
    }

    let models = s.controller.state().models.clone();
    let loading_models = s.models_rx.is_some();
    let mut save = false;
    let mut cancel = false;
    let mut refresh = false;
    let mut prompt_edits = Vec::new();

    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(true)
        .vscroll(true)
        .default_width(560.0)
        .open(&mut open)
        .show(ctx, |ui| {
            let d = &mut s.settings_draft;

            ui.heading("OpenRouter");
            egui::Grid::new("api_grid").num_columns(2).spacing([12.0, 6.0]).show(ui, |ui| {
                ui.label("API key");
                ui.add(egui::TextEdit::singleline(&mut d.api_key).password(true).desired_width(320.0));
                ui.end_row();

                ui.label("Max tokens");
                ui.add(egui::DragValue::new(&mut d.max_tokens).clamp_range(1..=200_000));
                ui.end_row();

                ui.label("Web search");
                ui.horizontal(|ui| {
                    ui.checkbox(&mut d.web_search, "Enabled");
                    ui.add_enabled(
                        d.web_search,
                        egui::DragValue::new(&mut d.web_search_max_results)
                            .clamp_range(1..=10)
                            .suffix(" results"),
                    );
                });
                ui.end_row();

                ui.label("Default model");
                let current = models
                    .iter()
                    .find(|m| m.id == d.default_model)
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| d.default_model.clone());
                egui::ComboBox::from_id_source("default_model")
                    .width(320.0)
                    .selected_text(current)
                    .show_ui(ui, |ui| {
                        let enabled = enabled_models(&models, &d.selected_models);
                        let list = if enabled.is_empty() { models.iter().collect() } else { enabled };
                        for m in list {
                            ui.selectable_value(&mut d.default_model, m.id.clone(), m.label());
                        }
                    });
                ui.end_row();
            });

            ui.separator();
            ui.heading("Appearance");
            egui::Grid::new("look_grid").num_columns(2).spacing([12.0, 6.0]).show(ui, |ui| {
                ui.label("Theme");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut d.theme, Theme::Light, "Light");
                    ui.radio_value(&mut d.theme, Theme::Dark, "Dark");
                });
                ui.end_row();

                ui.label("Font size");
                ui.add(egui::Slider::new(&mut d.font_size, 10..=24));
                ui.end_row();

                ui.label("Search engine");
                egui::ComboBox::from_id_source("search_engine")
                    .selected_text(d.search_engine.display_name())
                    .show_ui(ui, |ui| {
                        for engine in SearchEngine::all() {
                            ui.selectable_value(&mut d.search_engine, engine, engine.display_name());
                        }
                    });
                ui.end_row();

                ui.label("Conversations");
                ui.checkbox(&mut d.auto_save, "Auto save");
                ui.end_row();
            });

            ui.separator();
            ui.heading("Context");
            ui.checkbox(
                &mut d.include_previous_messages_in_context,
                "Include previous messages",
            );
            ui.horizontal(|ui| {
                ui.label("Context window");
                ui.add_enabled(
                    d.include_previous_messages_in_context,
                    egui::DragValue::new(&mut d.previous_messages_context_window)
                        .clamp_range(0..=1_000_000)
                        .suffix(" words"),
                );
            });
            ui.horizontal(|ui| {
                ui.label("System prompt");
                for mode in [SystemPromptMode::Once, SystemPromptMode::Always] {
                    ui.radio_value(&mut d.system_prompt_mode, mode, mode.display_name());
                }
            });

            ui.separator();
            ui.heading("System prompts");
            for prompt in &d.system_prompts {
                let title = if prompt.is_default {
                    format!("{} (default)", prompt.name)
                } else {
                    prompt.name.clone()
                };
                egui::CollapsingHeader::new(title)
                    .id_source(&prompt.id)
                    .show(ui, |ui| {
                        let mut name = prompt.name.clone();
                        ui.horizontal(|ui| {
                            ui.label("Name");
                            if ui.text_edit_singleline(&mut name).changed() {
                                prompt_edits.push(PromptEdit::Rename(prompt.id.clone(), name.clone()));
                            }
                        });
                        let mut content = prompt.content.clone();
                        let edited = ui.add(
                            egui::TextEdit::multiline(&mut content)
                                .desired_rows(3)
                                .desired_width(f32::INFINITY),
                        );
                        if edited.changed() {
                            prompt_edits.push(PromptEdit::Content(prompt.id.clone(), content));
                        }
                        ui.horizontal(|ui| {
                            if !prompt.is_default && ui.button("Make default").clicked() {
                                prompt_edits.push(PromptEdit::MakeDefault(prompt.id.clone()));
                            }
                            if prompt.id != DEFAULT_PROMPT_ID && ui.button("Delete").clicked() {
                                prompt_edits.push(PromptEdit::Delete(prompt.id.clone()));
                            }
                        });
                    });
            }
            if ui.button("+ Add prompt").clicked() {
                prompt_edits.push(PromptEdit::Add);
            }

            ui.separator();
            ui.horizontal(|ui| {
                ui.heading("Models");
                ui.label(
                    egui::RichText::new(format!("{} enabled", d.selected_models.len())).weak(),
                );
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if loading_models {
                        ui.spinner();
                    } else if ui.button("Refresh").on_hover_text("Fetch the model list again").clicked() {
                        refresh = true;
                    }
                });
            });
            ui.add(
                egui::TextEdit::singleline(&mut s.model_filter)
                    .hint_text("Filter models")
                    .desired_width(f32::INFINITY),
            );
            egui::ScrollArea::vertical()
                .id_source("model_list")
                .max_height(240.0)
                .show(ui, |ui| {
                    for m in filter_models(&models, &s.model_filter) {
                        let mut on = d.selected_models.contains(&m.id);
                        let hover = if m.description.is_empty() {
                            format_pricing(m.pricing.as_ref(), true)
                        } else {
                            format!("{}\n\n{}", format_pricing(m.pricing.as_ref(), true), m.description)
                        };
                        if ui.checkbox(&mut on, m.label()).on_hover_text(hover).changed() {
                            if on {
                                d.selected_models.push(m.id.clone());
                            } else {
                                d.selected_models.retain(|id| id != &m.id);
                            }
                        }
                    }
                });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Save").clicked() {
                    save = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

    for edit in prompt_edits {
        let d = &mut s.settings_draft;
        let result = match edit {
            PromptEdit::Rename(id, name) => prompts::rename_prompt(d, &id, &name),
            PromptEdit::Content(id, content) => prompts::set_prompt_content(d, &id, &content),
            PromptEdit::MakeDefault(id) => prompts::set_default_prompt(d, &id),
            PromptEdit::Delete(id) => prompts::delete_prompt(d, &id),
            PromptEdit::Add => {
                prompts::add_prompt(d);
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!("prompt edit failed: {}", e);
        }
    }

    if save {
        s.save_settings();
    } else if !open || cancel {
        s.show_settings = false;
    }
    if refresh {
        s.refresh_models();
    }
}
