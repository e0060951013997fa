//! Ingredient scanner window: egui/eframe application.
//!
//! # Architecture
//!
//! [`ScannerApp`] is the top-level [`eframe::App`].  It never touches the
//! camera or the recognizer; it reads and talks to the session through:
//!
//! * `shared`: [`SharedSession`] snapshot, read every frame.
//! * `command_tx`: sends [`SessionCommand`] to the running
//!   [`ScanSession`](crate::session::ScanSession).
//! * `events_rx`: receives [`SessionEvent`] notifications for the notice line.
//!
//! Recipe requests run on the tokio runtime via `runtime.spawn`; their
//! replies come back on an unbounded channel polled in `update`.
//!
//! # Session panels
//!
//! | State | Panel |
//! |-------|-------|
//! | `Idle` | "Point the camera at an ingredient" + manual entry button |
//! | `Scanning` | Spinner + "Identifying..." |
//! | `AwaitingConfirmation` | Proposed name, confidence, Confirm / Try again / Enter manually |
//! | `ManualEntry` | Text field, Add / Cancel |
//! | `Paused` | "Camera is off" + manual entry button |

use std::sync::{Arc, PoisonError};
use std::time::{Duration, Instant};

use eframe::egui;
use tokio::sync::mpsc;

use crate::recipes::{
    AdaptInstructionsRequest, CustomizeRecipeRequest, Recipe, RecipeAssistant, RecipeError,
    SkillLevel, SuggestRecipesRequest,
};
use crate::session::{SessionCommand, SessionEvent, SessionSnapshot, SessionState, SharedSession};

/// How long a notice stays on screen.
const NOTICE_TTL: Duration = Duration::from_secs(4);

const GRAY: egui::Color32 = egui::Color32::from_rgb(140, 140, 140);
const BLUE: egui::Color32 = egui::Color32::from_rgb(68, 136, 255);
const GREEN: egui::Color32 = egui::Color32::from_rgb(80, 200, 120);
const ORANGE: egui::Color32 = egui::Color32::from_rgb(255, 136, 68);

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoticeLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone)]
struct Notice {
    text: String,
    level: NoticeLevel,
    shown_at: Instant,
}

/// Text shown for a session event, if it deserves one.
fn notice_for(event: &SessionEvent) -> Option<(String, NoticeLevel)> {
    match event {
        SessionEvent::IngredientConfirmed { name } => {
            Some((format!("Added {name}"), NoticeLevel::Info))
        }
        SessionEvent::CameraPermissionDenied => Some((
            "Camera permission denied. You can still add ingredients manually.".into(),
            NoticeLevel::Warning,
        )),
        SessionEvent::CameraUnavailable(reason) => Some((
            format!("Camera unavailable: {reason}"),
            NoticeLevel::Warning,
        )),
        SessionEvent::InferenceWarning(message) => Some((
            format!("Could not identify the ingredient ({message})"),
            NoticeLevel::Warning,
        )),
        SessionEvent::ManualEntryRejected(message) => {
            Some((message.clone(), NoticeLevel::Warning))
        }
        SessionEvent::StateChanged(_) => None,
    }
}

/// Split a comma-separated tool list, dropping blanks.
fn parse_tools(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Plain-text rendering of a recipe, used as input for customize / adapt.
fn recipe_text(recipe: &Recipe) -> String {
    format!(
        "{}\n\nIngredients: {}\n\n{}",
        recipe.name,
        recipe.ingredients.join(", "),
        recipe.instructions
    )
}

// ---------------------------------------------------------------------------
// Recipe replies
// ---------------------------------------------------------------------------

enum RecipeReply {
    Suggestions(Result<Vec<Recipe>, RecipeError>),
    Rewritten {
        recipe: usize,
        result: Result<String, RecipeError>,
    },
}

enum RecipeAction {
    Customize(usize),
    Adapt(usize),
}

// ---------------------------------------------------------------------------
// ScannerApp
// ---------------------------------------------------------------------------

/// eframe application: the ingredient scanner window.
pub struct ScannerApp {
    // ── Session ──────────────────────────────────────────────────────────
    shared: SharedSession,
    command_tx: mpsc::Sender<SessionCommand>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,

    // ── Recipes ──────────────────────────────────────────────────────────
    assistant: Arc<dyn RecipeAssistant>,
    runtime: tokio::runtime::Handle,
    recipe_tx: mpsc::UnboundedSender<RecipeReply>,
    recipe_rx: mpsc::UnboundedReceiver<RecipeReply>,
    recipe_busy: bool,
    suggestions: Vec<Recipe>,
    /// Customized or adapted text, keyed by suggestion index.
    rewritten: Option<(usize, String)>,

    // ── UI state ─────────────────────────────────────────────────────────
    manual_text: String,
    dietary: String,
    cuisine: String,
    skill: SkillLevel,
    tools: String,
    notice: Option<Notice>,
    spinner_phase: f32,
}

impl ScannerApp {
    /// Create a new [`ScannerApp`].
    ///
    /// * `shared`: snapshot published by the scan session.
    /// * `command_tx`: sender end of the session command channel.
    /// * `events_rx`: receiver end of the session event channel.
    /// * `assistant`: recipe backend.
    /// * `runtime`: handle of the runtime the session runs on.
    pub fn new(
        shared: SharedSession,
        command_tx: mpsc::Sender<SessionCommand>,
        events_rx: mpsc::UnboundedReceiver<SessionEvent>,
        assistant: Arc<dyn RecipeAssistant>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (recipe_tx, recipe_rx) = mpsc::unbounded_channel();
        Self {
            shared,
            command_tx,
            events_rx,
            assistant,
            runtime,
            recipe_tx,
            recipe_rx,
            recipe_busy: false,
            suggestions: Vec::new(),
            rewritten: None,
            manual_text: String::new(),
            dietary: String::new(),
            cuisine: String::new(),
            skill: SkillLevel::default(),
            tools: String::new(),
            notice: None,
            spinner_phase: 0.0,
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    fn send(&mut self, command: SessionCommand) {
        if let Err(e) = self.command_tx.try_send(command) {
            log::warn!("ui: session command dropped: {e}");
            self.show_notice("Busy, please try again".into(), NoticeLevel::Warning);
        }
    }

    /// Drain all pending session events (non-blocking).
    fn poll_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            if matches!(event, SessionEvent::IngredientConfirmed { .. }) {
                self.manual_text.clear();
            }
            if let Some((text, level)) = notice_for(&event) {
                self.show_notice(text, level);
            }
        }
    }

    /// Drain all finished recipe requests (non-blocking).
    fn poll_recipes(&mut self) {
        while let Ok(reply) = self.recipe_rx.try_recv() {
            self.recipe_busy = false;
            match reply {
                RecipeReply::Suggestions(Ok(recipes)) => {
                    if recipes.is_empty() {
                        self.show_notice("No recipes suggested".into(), NoticeLevel::Info);
                    }
                    self.suggestions = recipes;
                    self.rewritten = None;
                }
                RecipeReply::Rewritten {
                    recipe,
                    result: Ok(text),
                } => {
                    self.rewritten = Some((recipe, text));
                }
                RecipeReply::Suggestions(Err(e))
                | RecipeReply::Rewritten { result: Err(e), .. } => {
                    log::warn!("recipes: {e}");
                    self.show_notice(e.to_string(), NoticeLevel::Warning);
                }
            }
        }
    }

    fn show_notice(&mut self, text: String, level: NoticeLevel) {
        self.notice = Some(Notice {
            text,
            level,
            shown_at: Instant::now(),
        });
    }

    fn expire_notice(&mut self) {
        if self
            .notice
            .as_ref()
            .is_some_and(|n| n.shown_at.elapsed() >= NOTICE_TTL)
        {
            self.notice = None;
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ── Recipe requests ──────────────────────────────────────────────────

    fn request_suggestions(&mut self, ingredients: Vec<String>) {
        let request = SuggestRecipesRequest {
            ingredients,
            dietary_restrictions: Some(self.dietary.clone()),
            cuisine_preferences: Some(self.cuisine.clone()),
        };
        let assistant = Arc::clone(&self.assistant);
        let tx = self.recipe_tx.clone();
        self.recipe_busy = true;
        self.runtime.spawn(async move {
            let result = assistant.suggest(&request).await;
            let _ = tx.send(RecipeReply::Suggestions(result));
        });
    }

    fn request_rewrite(&mut self, action: RecipeAction) {
        let index = match action {
            RecipeAction::Customize(i) | RecipeAction::Adapt(i) => i,
        };
        let Some(recipe) = self.suggestions.get(index) else {
            return;
        };
        let text = recipe_text(recipe);
        let tools = parse_tools(&self.tools);
        let assistant = Arc::clone(&self.assistant);
        let tx = self.recipe_tx.clone();
        self.recipe_busy = true;

        match action {
            RecipeAction::Customize(_) => {
                let request = CustomizeRecipeRequest {
                    recipe: text,
                    dietary_restrictions: self.dietary.clone(),
                    skill_level: Some(self.skill),
                    available_tools: tools,
                };
                self.runtime.spawn(async move {
                    let result = assistant.customize(&request).await;
                    let _ = tx.send(RecipeReply::Rewritten {
                        recipe: index,
                        result,
                    });
                });
            }
            RecipeAction::Adapt(_) => {
                let request = AdaptInstructionsRequest {
                    recipe: text,
                    skill_level: self.skill,
                    available_tools: tools,
                };
                self.runtime.spawn(async move {
                    let result = assistant.adapt(&request).await;
                    let _ = tx.send(RecipeReply::Rewritten {
                        recipe: index,
                        result,
                    });
                });
            }
        }
    }

    // ── Title bar ────────────────────────────────────────────────────────

    fn draw_title_bar(&mut self, ui: &mut egui::Ui, snap: &SessionSnapshot) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("Ingredient Scanner")
                    .color(egui::Color32::from_rgb(200, 200, 200))
                    .size(14.0),
            );
            ui.label(
                egui::RichText::new(snap.state.label())
                    .color(state_color(&snap.state))
                    .size(11.0),
            );

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if snap.camera.opening {
                    ui.label(
                        egui::RichText::new("Starting camera...")
                            .color(GRAY)
                            .size(11.0),
                    );
                    return;
                }
                let label = if snap.camera.active {
                    "Camera off"
                } else {
                    "Camera on"
                };
                if ui.button(egui::RichText::new(label).size(11.0)).clicked() {
                    let command = if snap.camera.active {
                        SessionCommand::DeactivateCamera
                    } else {
                        SessionCommand::ActivateCamera
                    };
                    self.send(command);
                }
            });
        });
    }

    // ── State-specific panel renderers ───────────────────────────────────

    fn draw_idle(&mut self, ui: &mut egui::Ui, camera_active: bool) {
        let hint = if camera_active {
            "Point the camera at an ingredient"
        } else {
            "Turn the camera on to start scanning"
        };
        ui.label(egui::RichText::new(hint).color(GRAY).size(13.0));
        ui.add_space(4.0);
        if ui.button("Enter manually").clicked() {
            self.send(SessionCommand::RequestManualEntry);
        }
    }

    fn draw_scanning(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new(format!("{} Identifying...", self.spinner_char()))
                    .color(BLUE)
                    .size(13.0),
            );
            if ui.small_button("Enter manually").clicked() {
                self.send(SessionCommand::RequestManualEntry);
            }
        });
    }

    fn draw_awaiting(&mut self, ui: &mut egui::Ui, name: &str, confidence: f32) {
        ui.label(
            egui::RichText::new(format!("Is this {name}?"))
                .color(GREEN)
                .size(15.0)
                .strong(),
        );
        ui.label(
            egui::RichText::new(format!("confidence {:.0}%", confidence * 100.0))
                .color(GRAY)
                .size(11.0),
        );
        ui.add_space(4.0);
        ui.horizontal(|ui| {
            if ui.button("Confirm").clicked() {
                self.send(SessionCommand::Confirm);
            }
            if ui.button("Try again").clicked() {
                self.send(SessionCommand::Retry);
            }
            if ui.button("Enter manually").clicked() {
                self.send(SessionCommand::SwitchToManual);
            }
        });
    }

    fn draw_manual_entry(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("What is this ingredient?").size(13.0));
        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.manual_text)
                    .hint_text("e.g. Mozzarella")
                    .desired_width(200.0),
            );
            let entered =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Add").clicked() || entered {
                let text = self.manual_text.clone();
                self.send(SessionCommand::SubmitManual(text));
            }
            if ui.button("Cancel").clicked() {
                self.manual_text.clear();
                self.send(SessionCommand::CancelManualEntry);
            }
        });
    }

    fn draw_paused(&mut self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new("Camera is off").color(GRAY).size(13.0));
        ui.add_space(4.0);
        if ui.button("Enter manually").clicked() {
            self.send(SessionCommand::RequestManualEntry);
        }
    }

    fn draw_notice(&self, ui: &mut egui::Ui) {
        if let Some(notice) = &self.notice {
            let color = match notice.level {
                NoticeLevel::Info => GREEN,
                NoticeLevel::Warning => ORANGE,
            };
            ui.add_space(4.0);
            ui.label(egui::RichText::new(&notice.text).color(color).size(11.0));
        }
    }

    fn draw_ingredients(&self, ui: &mut egui::Ui, ingredients: &[String]) {
        ui.label(egui::RichText::new(format!("Ingredients ({})", ingredients.len())).size(13.0));
        if ingredients.is_empty() {
            ui.label(egui::RichText::new("None yet").color(GRAY).size(11.0));
            return;
        }
        for name in ingredients {
            ui.label(egui::RichText::new(format!("• {name}")).size(12.0));
        }
    }

    fn draw_recipes(&mut self, ui: &mut egui::Ui, ingredients: &[String]) {
        egui::CollapsingHeader::new("Recipes")
            .default_open(false)
            .show(ui, |ui| {
                egui::Grid::new("recipe-prefs").num_columns(2).show(ui, |ui| {
                    ui.label("Dietary");
                    ui.text_edit_singleline(&mut self.dietary);
                    ui.end_row();
                    ui.label("Cuisine");
                    ui.text_edit_singleline(&mut self.cuisine);
                    ui.end_row();
                    ui.label("Tools");
                    ui.add(egui::TextEdit::singleline(&mut self.tools).hint_text("oven, blender"));
                    ui.end_row();
                    ui.label("Skill");
                    egui::ComboBox::from_id_salt("skill-level")
                        .selected_text(self.skill.as_str())
                        .show_ui(ui, |ui| {
                            for level in SkillLevel::ALL {
                                ui.selectable_value(&mut self.skill, level, level.as_str());
                            }
                        });
                    ui.end_row();
                });

                ui.add_space(4.0);
                ui.horizontal(|ui| {
                    let enabled = !ingredients.is_empty() && !self.recipe_busy;
                    if ui
                        .add_enabled(enabled, egui::Button::new("Suggest recipes"))
                        .clicked()
                    {
                        self.request_suggestions(ingredients.to_vec());
                    }
                    if self.recipe_busy {
                        ui.label(egui::RichText::new(self.spinner_char().to_string()).color(BLUE));
                    }
                });

                let mut action = None;
                for (i, recipe) in self.suggestions.iter().enumerate() {
                    egui::CollapsingHeader::new(recipe.name.as_str())
                        .id_salt(("recipe", i))
                        .show(ui, |ui| {
                            if !recipe.ingredients.is_empty() {
                                ui.label(
                                    egui::RichText::new(recipe.ingredients.join(", "))
                                        .color(GRAY)
                                        .size(11.0),
                                );
                            }
                            ui.label(recipe.instructions.as_str());
                            ui.horizontal(|ui| {
                                if ui
                                    .add_enabled(!self.recipe_busy, egui::Button::new("Customize"))
                                    .clicked()
                                {
                                    action = Some(RecipeAction::Customize(i));
                                }
                                if ui
                                    .add_enabled(!self.recipe_busy, egui::Button::new("Adapt"))
                                    .clicked()
                                {
                                    action = Some(RecipeAction::Adapt(i));
                                }
                            });
                            if let Some((index, text)) = &self.rewritten {
                                if *index == i {
                                    ui.separator();
                                    ui.label(egui::RichText::new(text.as_str()).color(GREEN));
                                }
                            }
                        });
                }
                if let Some(action) = action {
                    self.request_rewrite(action);
                }
            });
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn spinner_char(&self) -> char {
        let chars = ['|', '/', '-', '\\'];
        let idx = (self.spinner_phase as usize) % chars.len();
        chars[idx]
    }
}

fn state_color(state: &SessionState) -> egui::Color32 {
    match state {
        SessionState::Idle => GRAY,
        SessionState::Scanning => BLUE,
        SessionState::AwaitingConfirmation(_) => GREEN,
        SessionState::ManualEntry => ORANGE,
        SessionState::Paused => egui::Color32::from_rgb(100, 100, 100),
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for ScannerApp {
    /// Called every frame by eframe.  Polls channels, reads the session
    /// snapshot, then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_events();
        self.poll_recipes();
        self.expire_notice();

        self.spinner_phase += 0.08;
        if self.spinner_phase >= 4.0 {
            self.spinner_phase = 0.0;
        }

        let snap = self.snapshot();

        // The session runs on another thread; keep polling its snapshot.
        let busy = snap.state == SessionState::Scanning || self.recipe_busy;
        ctx.request_repaint_after(Duration::from_millis(if busy { 66 } else { 200 }));

        let frame = egui::Frame::new()
            .fill(egui::Color32::from_rgb(30, 30, 30))
            .inner_margin(egui::Margin::same(10));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            self.draw_title_bar(ui, &snap);
            ui.separator();

            match &snap.state {
                SessionState::Idle => self.draw_idle(ui, snap.camera.active),
                SessionState::Scanning => self.draw_scanning(ui),
                SessionState::AwaitingConfirmation(result) => {
                    self.draw_awaiting(ui, result.name(), result.confidence())
                }
                SessionState::ManualEntry => self.draw_manual_entry(ui),
                SessionState::Paused => self.draw_paused(ui),
            }
            self.draw_notice(ui);

            ui.separator();
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.draw_ingredients(ui, &snap.ingredients);
                ui.separator();
                self.draw_recipes(ui, &snap.ingredients);
            });
        });
    }

    /// Stop the scan session and release the camera.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("ui: window closing");
        let _ = self.command_tx.try_send(SessionCommand::Shutdown);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_changes_produce_no_notice() {
        assert!(notice_for(&SessionEvent::StateChanged(SessionState::Idle)).is_none());
    }

    #[test]
    fn confirmations_are_info() {
        let (text, level) = notice_for(&SessionEvent::IngredientConfirmed {
            name: "Tomato".into(),
        })
        .unwrap();
        assert_eq!(text, "Added Tomato");
        assert_eq!(level, NoticeLevel::Info);
    }

    #[test]
    fn camera_problems_are_warnings() {
        let (_, level) = notice_for(&SessionEvent::CameraPermissionDenied).unwrap();
        assert_eq!(level, NoticeLevel::Warning);
        let (text, _) = notice_for(&SessionEvent::CameraUnavailable("busy".into())).unwrap();
        assert!(text.contains("busy"));
    }

    #[test]
    fn tools_are_split_and_trimmed() {
        assert_eq!(
            parse_tools(" oven, , blender ,knife"),
            vec!["oven", "blender", "knife"]
        );
        assert!(parse_tools("  ").is_empty());
    }

    #[test]
    fn recipe_text_includes_all_parts() {
        let recipe = Recipe {
            name: "Caprese".into(),
            ingredients: vec!["Tomato".into(), "Mozzarella".into()],
            instructions: "Slice and layer.".into(),
        };
        let text = recipe_text(&recipe);
        assert!(text.starts_with("Caprese"));
        assert!(text.contains("Tomato, Mozzarella"));
        assert!(text.ends_with("Slice and layer."));
    }
}
