use std::sync::Arc;
use std::time::Duration;

use eframe::App;
use egui::{self, Align, Color32, Context, Frame, Layout, RichText, Ui, Vec2};

use crate::api::VoiceApiClient;
use crate::audio::AudioPlayer;
use crate::controller::FormController;
use crate::error::AppError;
use crate::settings::{api_base_from_env, resolve_api_base, save_settings, Settings, API_BASE_ENV};

const DOWNLOAD_FILE_NAME: &str = "generated_audio.wav";

pub struct VoicegenApp {
    controller: Option<FormController>,
    config_error: Option<String>,

    player: Option<AudioPlayer>,
    player_error: Option<String>,

    settings: Settings,
    settings_modal: Option<SettingsModal>,

    status_text: Option<String>,
}

enum FormAction {
    Generate,
    Download,
    TogglePlayback,
}

impl VoicegenApp {
    pub fn new(settings: Settings) -> Self {
        let (player, player_error) = match AudioPlayer::new() {
            Ok(player) => (Some(player), None),
            Err(err) => {
                log::warn!("Audio preview unavailable: {err}");
                (None, Some(err.to_string()))
            }
        };

        let mut app = Self {
            controller: None,
            config_error: None,
            player,
            player_error,
            settings,
            settings_modal: None,
            status_text: None,
        };
        app.remount();
        app
    }

    /// Replaces the form with a fresh one built from the current settings.
    fn remount(&mut self) {
        if let Some(player) = &mut self.player {
            player.stop();
        }
        self.status_text = None;
        match build_controller(&self.settings) {
            Ok(mut controller) => {
                controller.mount();
                self.controller = Some(controller);
                self.config_error = None;
            }
            Err(err) => {
                log::warn!("Speech API unavailable: {err}");
                self.controller = None;
                self.config_error = Some(err.to_string());
            }
        }
    }

    fn show_form(&mut self, ui: &mut Ui) -> Option<FormAction> {
        let controller = self.controller.as_mut()?;
        let mut action = None;

        ui.label("Text Prompt");
        ui.add(
            egui::TextEdit::singleline(controller.text_prompt_mut())
                .hint_text("Enter your text here")
                .desired_width(f32::INFINITY),
        );

        ui.add_space(8.0);
        ui.label("Language");
        let current_language = controller.selection().language.clone();
        let mut picked_language = None;
        egui::ComboBox::from_id_source("language")
            .width(ui.available_width())
            .selected_text(current_language.as_deref().unwrap_or("Select Language"))
            .show_ui(ui, |ui| {
                if let Some(catalog) = controller.catalog() {
                    for language in catalog.languages() {
                        let selected = current_language.as_deref() == Some(language);
                        if ui.selectable_label(selected, language).clicked() && !selected {
                            picked_language = Some(language.to_string());
                        }
                    }
                }
            });
        if let Some(language) = picked_language {
            controller.select_language(&language);
        }

        ui.add_space(8.0);
        ui.label("Voice Preset");
        let current_voice = controller.selection().voice_name.clone();
        let language = controller.selection().language.clone();
        let mut picked_voice = None;
        egui::ComboBox::from_id_source("voice_preset")
            .width(ui.available_width())
            .selected_text(current_voice.as_deref().unwrap_or("Select Voice Preset"))
            .show_ui(ui, |ui| {
                if let (Some(catalog), Some(language)) = (controller.catalog(), language.as_deref())
                {
                    for preset in catalog.voices(language) {
                        let selected = current_voice.as_deref() == Some(preset.as_str());
                        if ui.selectable_label(selected, preset).clicked() {
                            picked_voice = Some(preset.clone());
                        }
                    }
                }
            });
        if let Some(voice) = picked_voice {
            controller.select_voice(&voice);
        }

        ui.add_space(12.0);
        let busy = controller.is_busy();
        let label = if busy { "Generating..." } else { "Generate Audio" };
        let width = ui.available_width();
        if ui
            .add_enabled(
                !busy,
                egui::Button::new(RichText::new(label).size(16.0).strong())
                    .min_size(Vec2::new(width, 36.0)),
            )
            .clicked()
        {
            action = Some(FormAction::Generate);
        }

        if let Some(audio) = controller.generated() {
            ui.add_space(10.0);
            Frame::group(ui.style())
                .inner_margin(egui::Margin::same(10.0))
                .rounding(egui::Rounding::same(8.0))
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    let summary = match audio.info() {
                        Some(info) => format!(
                            "{} · {} Hz · {} ch · {:.1} KiB",
                            time_display(info.duration),
                            info.sample_rate,
                            info.channels,
                            audio.len() as f64 / 1024.0
                        ),
                        None => format!("{:.1} KiB of audio", audio.len() as f64 / 1024.0),
                    };
                    ui.label(RichText::new(summary).monospace());
                    ui.horizontal(|ui| {
                        if ui.button("⬇ Download Audio").clicked() {
                            action = Some(FormAction::Download);
                        }
                        let playing = self.player.as_ref().is_some_and(AudioPlayer::is_playing);
                        let play_label = if playing { "■ Stop" } else { "▶ Play" };
                        if ui.button(play_label).clicked() {
                            action = Some(FormAction::TogglePlayback);
                        }
                        if playing {
                            if let Some(player) = &self.player {
                                let total = player
                                    .duration()
                                    .map(time_display)
                                    .unwrap_or_else(|| "--:--:--".to_string());
                                ui.label(
                                    RichText::new(format!(
                                        "{} / {total}",
                                        time_display(player.elapsed())
                                    ))
                                    .monospace(),
                                );
                            }
                        }
                    });
                });
        }

        action
    }

    fn apply(&mut self, action: FormAction) {
        match action {
            FormAction::Generate => {
                if let Some(controller) = &mut self.controller {
                    if controller.generate() {
                        self.status_text = None;
                    }
                }
            }
            FormAction::Download => self.download_audio(),
            FormAction::TogglePlayback => self.toggle_playback(),
        }
    }

    fn download_audio(&mut self) {
        let Some(controller) = &self.controller else {
            return;
        };
        if controller.generated().is_none() {
            return;
        }
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save Audio")
            .set_file_name(DOWNLOAD_FILE_NAME)
            .add_filter("WAV audio", &["wav"])
            .save_file()
        else {
            return;
        };
        match controller.download_to(&path) {
            Ok(Some(_)) => self.status_text = Some(format!("Audio saved to {}", path.display())),
            Ok(None) => {}
            Err(err) => {
                log::error!("Error saving audio: {err}");
                self.status_text = Some(format!("Failed to save file: {err}"));
            }
        }
    }

    fn toggle_playback(&mut self) {
        let Some(player) = &mut self.player else {
            self.status_text = self.player_error.clone();
            return;
        };
        if player.is_playing() {
            player.stop();
            return;
        }
        let Some(audio) = self.controller.as_ref().and_then(FormController::generated) else {
            return;
        };
        if let Err(err) = player.play(audio) {
            log::warn!("Playback failed: {err}");
            self.status_text = Some(err.to_string());
        }
    }
}

impl App for VoicegenApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if let Some(controller) = &mut self.controller {
            if controller.poll() {
                ctx.request_repaint();
            }
        }
        if let Some(player) = &mut self.player {
            player.refresh();
        }

        egui::TopBottomPanel::top("topbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("voicegen").heading());
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Settings").clicked() {
                        self.settings_modal = Some(SettingsModal::from(&self.settings));
                    }
                });
            });
        });

        let mut action = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(6.0);
            if let Some(err) = &self.config_error {
                ui.colored_label(Color32::from_rgb(200, 60, 60), err);
                ui.label("Open Settings to configure the speech API.");
                return;
            }
            action = self.show_form(ui);

            ui.add_space(6.0);
            if let Some(status) = &self.status_text {
                ui.label(status);
            }
        });
        if let Some(action) = action {
            self.apply(action);
            ctx.request_repaint();
        }

        if let Some(mut modal) = self.settings_modal.take() {
            let mut open = true;
            let mut keep_modal = true;
            egui::Window::new("Settings")
                .collapsible(false)
                .resizable(false)
                .default_size(Vec2::new(380.0, 200.0))
                .open(&mut open)
                .show(ctx, |ui| {
                    keep_modal = modal.show(ui, self);
                });
            if open && keep_modal {
                self.settings_modal = Some(modal);
            }
        }

        let pending = self
            .controller
            .as_ref()
            .is_some_and(|c| c.is_busy() || c.is_loading_catalog());
        let playing = self.player.as_ref().is_some_and(AudioPlayer::is_playing);
        if pending || playing {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

struct SettingsModal {
    api_base: String,
    timeout_secs: u64,
}

impl SettingsModal {
    fn from(settings: &Settings) -> Self {
        Self {
            api_base: settings.api_base.clone().unwrap_or_default(),
            timeout_secs: settings.request_timeout().as_secs(),
        }
    }

    fn show(&mut self, ui: &mut Ui, app: &mut VoicegenApp) -> bool {
        ui.spacing_mut().item_spacing = Vec2::new(12.0, 12.0);
        let mut keep_open = true;

        ui.vertical(|ui| {
            ui.label("Speech API base URL");
            ui.add(
                egui::TextEdit::singleline(&mut self.api_base)
                    .hint_text("http://localhost:8000")
                    .desired_width(f32::INFINITY),
            );
            if api_base_from_env().is_some() {
                ui.label(
                    RichText::new(format!("{API_BASE_ENV} is set and takes precedence"))
                        .small()
                        .weak(),
                );
            }

            ui.horizontal(|ui| {
                ui.label("Request timeout (s)");
                ui.add(egui::DragValue::new(&mut self.timeout_secs).clamp_range(1..=600));
            });

            ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                if ui.button("Save").clicked() {
                    self.persist(app);
                    keep_open = false;
                }
                if ui.button("Cancel").clicked() {
                    keep_open = false;
                }
            });
        });
        keep_open
    }

    fn persist(&self, app: &mut VoicegenApp) {
        let api_base = self.api_base.trim().trim_end_matches('/');
        let settings = Settings {
            api_base: (!api_base.is_empty()).then(|| api_base.to_string()),
            request_timeout_secs: self.timeout_secs,
        };
        if let Err(err) = save_settings(&settings) {
            log::error!("Error saving settings: {err:#}");
        }
        app.settings = settings;
        app.remount();
    }
}

fn build_controller(settings: &Settings) -> Result<FormController, AppError> {
    let env_base = api_base_from_env();
    let base_url = resolve_api_base(env_base.as_deref(), settings)?;
    let client = VoiceApiClient::new(base_url, settings.request_timeout())?;
    log::info!("Using speech API at {}", client.base_url());
    Ok(FormController::new(Arc::new(client)))
}

fn time_display(duration: Duration) -> String {
    let secs = duration.as_secs();
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_durations() {
        assert_eq!(time_display(Duration::from_millis(500)), "00:00:00");
        assert_eq!(time_display(Duration::from_secs(75)), "00:01:15");
        assert_eq!(time_display(Duration::from_secs(3 * 3600 + 5)), "03:00:05");
    }
}
