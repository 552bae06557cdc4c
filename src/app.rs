//! Application state and core logic.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::config::{Config, LoadedConfig};
use crate::modals::{
    FileAction, FilePromptState, InsertPickerState, Modal, NewDefinitionState, ParamEditState,
};
use crate::persistence;
use crate::registry::DefinitionRegistry;
use crate::render::render_sequence;
use crate::sequence::ExecutionSequence;

/// Panels that can hold keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusPanel {
    #[default]
    Definitions,
    Sequence,
    Preview,
}

impl FocusPanel {
    pub fn next(self) -> Self {
        match self {
            Self::Definitions => Self::Sequence,
            Self::Sequence => Self::Preview,
            Self::Preview => Self::Definitions,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Definitions => Self::Preview,
            Self::Sequence => Self::Definitions,
            Self::Preview => Self::Sequence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Error,
}

/// A popup notice shown until the user dismisses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub title: String,
    pub text: String,
}

/// Main application state.
pub struct App {
    pub registry: DefinitionRegistry,
    pub sequence: ExecutionSequence,
    /// Rendered output of the whole sequence, rebuilt after every change.
    pub preview: String,
    pub focus: FocusPanel,
    pub selected_definition: usize,
    pub selected_instance: usize,
    /// First visible instance in the sequence panel.
    pub sequence_scroll: usize,
    pub preview_scroll: u16,
    /// Height of the preview content area (excluding borders).
    pub preview_height: u16,
    /// Inline parameter editing of the selected instance.
    pub param_edit: Option<ParamEditState>,
    pub modal: Option<Modal>,
    pub message: Option<Message>,
    pub config: Config,
    pub session_id: Option<String>,
    pub log_directory: Option<PathBuf>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        session_id: Option<String>,
        log_directory: Option<PathBuf>,
        loaded_config: LoadedConfig,
    ) -> Self {
        Self {
            registry: DefinitionRegistry::new(),
            sequence: ExecutionSequence::new(),
            preview: String::new(),
            focus: FocusPanel::default(),
            selected_definition: 0,
            selected_instance: 0,
            sequence_scroll: 0,
            preview_scroll: 0,
            preview_height: 0,
            param_edit: None,
            modal: None,
            message: None,
            config: loaded_config.config,
            session_id,
            log_directory,
            should_quit: false,
        }
    }

    pub fn info(&mut self, title: &str, text: impl Into<String>) {
        self.message = Some(Message {
            kind: MessageKind::Info,
            title: title.to_string(),
            text: text.into(),
        });
    }

    pub fn error(&mut self, title: &str, text: impl Into<String>) {
        self.message = Some(Message {
            kind: MessageKind::Error,
            title: title.to_string(),
            text: text.into(),
        });
    }

    /// Re-render the preview from scratch.
    pub fn refresh_preview(&mut self) {
        self.preview = render_sequence(&self.sequence);
        self.preview_scroll = self.preview_scroll.min(self.max_preview_scroll());
    }

    pub fn max_preview_scroll(&self) -> u16 {
        let lines = u16::try_from(self.preview.lines().count()).unwrap_or(u16::MAX);
        lines.saturating_sub(self.preview_height)
    }

    pub fn scroll_preview_up(&mut self, amount: u16) {
        self.preview_scroll = self.preview_scroll.saturating_sub(amount);
    }

    pub fn scroll_preview_down(&mut self, amount: u16) {
        self.preview_scroll = (self.preview_scroll + amount).min(self.max_preview_scroll());
    }

    fn clamp_selections(&mut self) {
        self.selected_definition = self
            .selected_definition
            .min(self.registry.len().saturating_sub(1));
        self.selected_instance = self
            .selected_instance
            .min(self.sequence.len().saturating_sub(1));
    }

    /// Called after any change to the sequence list.
    fn sequence_changed(&mut self) {
        self.param_edit = None;
        self.clamp_selections();
        self.refresh_preview();
    }

    pub fn select_prev(&mut self) {
        match self.focus {
            FocusPanel::Definitions => {
                self.selected_definition = self.selected_definition.saturating_sub(1);
            }
            FocusPanel::Sequence => {
                self.selected_instance = self.selected_instance.saturating_sub(1);
            }
            FocusPanel::Preview => self.scroll_preview_up(1),
        }
    }

    pub fn select_next(&mut self) {
        match self.focus {
            FocusPanel::Definitions => {
                if self.selected_definition + 1 < self.registry.len() {
                    self.selected_definition += 1;
                }
            }
            FocusPanel::Sequence => {
                if self.selected_instance + 1 < self.sequence.len() {
                    self.selected_instance += 1;
                }
            }
            FocusPanel::Preview => self.scroll_preview_down(1),
        }
    }

    /// Keep the selected instance inside a window of `visible` entries.
    pub fn ensure_instance_visible(&mut self, visible: usize) {
        if visible == 0 {
            return;
        }
        if self.selected_instance < self.sequence_scroll {
            self.sequence_scroll = self.selected_instance;
        } else if self.selected_instance >= self.sequence_scroll + visible {
            self.sequence_scroll = self.selected_instance + 1 - visible;
        }
    }

    // Definitions

    pub fn open_new_definition(&mut self) {
        self.modal = Some(Modal::NewDefinition(NewDefinitionState::new()));
    }

    /// Validate and register a new definition, selecting it on success.
    pub fn create_definition(
        &mut self,
        name: &str,
        raw_params: &str,
        template: &str,
    ) -> Result<(), String> {
        self.registry
            .create(name, raw_params, template)
            .map_err(|e| e.to_string())?;
        self.selected_definition = self.registry.len() - 1;
        Ok(())
    }

    /// Delete the selected definition. Placed instances are left as they are.
    pub fn delete_selected_definition(&mut self) {
        if self.registry.delete(self.selected_definition).is_some() {
            self.clamp_selections();
            self.info("Deleted", "Block definition deleted");
        }
    }

    /// Append an instance of the selected definition to the sequence.
    pub fn add_selected_definition(&mut self) {
        let index = self.selected_definition;
        self.add_definition_at(index, None);
    }

    /// Place an instance of definition `index` at `position` (append when `None`).
    pub fn add_definition_at(&mut self, index: usize, position: Option<usize>) {
        let Some(definition) = self.registry.get(index).map(Rc::clone) else {
            return;
        };
        self.selected_instance = self.sequence.add(definition, position);
        self.sequence_changed();
    }

    // Sequence editing

    /// Open the insert picker targeting `position`.
    pub fn open_insert_picker(&mut self, position: usize) {
        if self.registry.is_empty() {
            self.info("Insert", "No block definitions yet; press n to create one");
            return;
        }
        self.modal = Some(Modal::InsertPicker(InsertPickerState::new(position)));
    }

    pub fn insert_above_selected(&mut self) {
        let position = self.selected_instance.min(self.sequence.len());
        self.open_insert_picker(position);
    }

    pub fn insert_below_selected(&mut self) {
        let position = if self.sequence.is_empty() {
            0
        } else {
            self.selected_instance + 1
        };
        self.open_insert_picker(position);
    }

    pub fn delete_selected_instance(&mut self) {
        if self.sequence.delete(self.selected_instance).is_some() {
            self.sequence_changed();
        }
    }

    pub fn copy_selected_instance(&mut self) {
        self.sequence.copy(self.selected_instance);
    }

    pub fn cut_selected_instance(&mut self) {
        if self.sequence.cut(self.selected_instance) {
            self.sequence_changed();
        }
    }

    /// Paste the clipboard instance at the selected position.
    pub fn paste_at_selected(&mut self) {
        if let Some(index) = self.sequence.paste(self.selected_instance) {
            self.selected_instance = index;
            self.sequence_changed();
        }
    }

    /// Start editing the parameters of the selected instance.
    pub fn begin_param_edit(&mut self) {
        let Some(instance) = self.sequence.get(self.selected_instance) else {
            return;
        };
        match ParamEditState::new(self.selected_instance, &instance.borrow()) {
            Some(state) => self.param_edit = Some(state),
            None => debug!(index = self.selected_instance, "no_params_to_edit"),
        }
    }

    /// Write a value into the selected instance and re-render.
    pub fn set_param_value(&mut self, index: usize, param: &str, value: &str) {
        if self.sequence.set_value(index, param, value) {
            self.refresh_preview();
        }
    }

    // Files

    pub fn open_file_prompt(&mut self, action: FileAction) {
        let default = match action {
            FileAction::ImportDefinitions | FileAction::ExportDefinitions => {
                &self.config.paths.definitions
            }
            FileAction::SaveProgress | FileAction::LoadProgress => &self.config.paths.session,
        };
        self.modal = Some(Modal::FilePrompt(FilePromptState::new(action, default)));
    }

    /// Run a file action, reporting the outcome in the message popup.
    pub fn run_file_action(&mut self, action: FileAction, path: &Path) {
        let result = match action {
            FileAction::ImportDefinitions => {
                persistence::import_definitions(&mut self.registry, path).map(|count| {
                    self.selected_definition = 0;
                    format!("Imported {} block definitions", count)
                })
            }
            FileAction::ExportDefinitions => persistence::export_definitions(&self.registry, path)
                .map(|()| "Block definitions exported".to_string()),
            FileAction::SaveProgress => {
                persistence::save_progress(&self.registry, &self.sequence, path)
                    .map(|()| "Progress saved".to_string())
            }
            FileAction::LoadProgress => {
                persistence::load_progress(&self.registry, &mut self.sequence, path).map(|count| {
                    self.selected_instance = 0;
                    self.sequence_scroll = 0;
                    format!("Loaded {} blocks", count)
                })
            }
        };

        match result {
            Ok(text) => {
                info!(action = ?action, path = ?path, "file_action_completed");
                if action == FileAction::LoadProgress {
                    self.sequence_changed();
                }
                self.clamp_selections();
                self.info(action.title(), text);
            }
            Err(e) => self.error(action.error_title(), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoadStatus;

    fn test_app() -> App {
        App::new(
            None,
            None,
            LoadedConfig {
                config: Config::default(),
                config_path: PathBuf::from("config.toml"),
                status: ConfigLoadStatus::Loaded,
            },
        )
    }

    fn app_with_definitions() -> App {
        let mut app = test_app();
        app.create_definition("print", "msg", "print({msg})").unwrap();
        app.create_definition("ret", "", "return").unwrap();
        app
    }

    #[test]
    fn test_focus_cycle() {
        assert_eq!(FocusPanel::Definitions.next(), FocusPanel::Sequence);
        assert_eq!(FocusPanel::Preview.next(), FocusPanel::Definitions);
        for panel in [
            FocusPanel::Definitions,
            FocusPanel::Sequence,
            FocusPanel::Preview,
        ] {
            assert_eq!(panel.next().prev(), panel);
        }
    }

    #[test]
    fn test_max_preview_scroll_saturates_on_long_preview() {
        let mut app = test_app();
        app.preview = "x\n".repeat(70_000);
        app.preview_height = 10;
        assert_eq!(app.max_preview_scroll(), u16::MAX - 10);

        app.preview = "a\nb\nc".to_string();
        assert_eq!(app.max_preview_scroll(), 0);
    }

    #[test]
    fn test_create_definition_error_is_reported() {
        let mut app = test_app();
        let err = app.create_definition("bad", "a|b", "{a}").unwrap_err();
        assert!(err.contains('b'));
        assert!(app.registry.is_empty());
    }

    #[test]
    fn test_add_selected_definition_updates_preview() {
        let mut app = app_with_definitions();
        app.selected_definition = 0;
        app.add_selected_definition();
        app.set_param_value(0, "msg", "hi");

        assert_eq!(app.sequence.len(), 1);
        assert_eq!(app.preview, "print(hi)\n\n");
    }

    #[test]
    fn test_insert_above_and_below() {
        let mut app = app_with_definitions();
        app.add_definition_at(0, None);
        app.add_definition_at(0, None);
        app.selected_instance = 1;

        app.insert_below_selected();
        let Some(Modal::InsertPicker(picker)) = &app.modal else {
            panic!("expected insert picker");
        };
        assert_eq!(picker.position, 2);

        app.insert_above_selected();
        let Some(Modal::InsertPicker(picker)) = &app.modal else {
            panic!("expected insert picker");
        };
        assert_eq!(picker.position, 1);
    }

    #[test]
    fn test_insert_picker_requires_definitions() {
        let mut app = test_app();
        app.insert_below_selected();
        assert!(app.modal.is_none());
        assert_eq!(app.message.as_ref().unwrap().kind, MessageKind::Info);
    }

    #[test]
    fn test_cut_paste_round_trip() {
        let mut app = app_with_definitions();
        app.add_definition_at(0, None);
        app.add_definition_at(1, None);
        app.selected_instance = 0;

        app.cut_selected_instance();
        assert_eq!(app.sequence.len(), 1);
        assert_eq!(app.preview, "return\n\n");

        app.paste_at_selected();
        assert_eq!(app.sequence.len(), 2);
        assert_eq!(app.preview, "print()\n\nreturn\n\n");
    }

    #[test]
    fn test_delete_definition_keeps_instances() {
        let mut app = app_with_definitions();
        app.add_definition_at(0, None);
        app.selected_definition = 0;
        app.delete_selected_definition();

        assert_eq!(app.registry.len(), 1);
        assert_eq!(app.sequence.len(), 1);
        assert_eq!(app.preview, "print()\n\n");
        assert_eq!(app.message.as_ref().unwrap().text, "Block definition deleted");
    }

    #[test]
    fn test_selection_clamped_after_delete() {
        let mut app = app_with_definitions();
        app.add_definition_at(0, None);
        app.add_definition_at(1, None);
        app.selected_instance = 1;
        app.delete_selected_instance();
        assert_eq!(app.selected_instance, 0);
    }

    #[test]
    fn test_ensure_instance_visible() {
        let mut app = app_with_definitions();
        for _ in 0..10 {
            app.add_definition_at(1, None);
        }
        app.selected_instance = 7;
        app.ensure_instance_visible(3);
        assert_eq!(app.sequence_scroll, 5);
        app.selected_instance = 2;
        app.ensure_instance_visible(3);
        assert_eq!(app.sequence_scroll, 2);
    }

    #[test]
    fn test_file_actions_report_messages() {
        let dir = tempfile::tempdir().unwrap();
        let defs = dir.path().join("blocks.json");
        let session = dir.path().join("session.json");
        let mut app = app_with_definitions();
        app.add_definition_at(0, None);
        app.set_param_value(0, "msg", "x");

        app.run_file_action(FileAction::ExportDefinitions, &defs);
        assert_eq!(app.message.as_ref().unwrap().kind, MessageKind::Info);
        app.run_file_action(FileAction::SaveProgress, &session);
        assert_eq!(app.message.as_ref().unwrap().kind, MessageKind::Info);

        let mut other = test_app();
        other.run_file_action(FileAction::ImportDefinitions, &defs);
        other.run_file_action(FileAction::LoadProgress, &session);
        assert_eq!(other.message.as_ref().unwrap().text, "Loaded 1 blocks");
        assert_eq!(other.preview, "print(x)\n\n");
    }

    #[test]
    fn test_file_action_failure_is_error_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_definitions();
        app.run_file_action(FileAction::LoadProgress, &dir.path().join("missing.json"));
        let message = app.message.as_ref().unwrap();
        assert_eq!(message.kind, MessageKind::Error);
        assert_eq!(message.title, "Load failed");
    }
}
