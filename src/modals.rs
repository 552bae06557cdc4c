//! Modal dialog state and input handling.

use crossterm::event::{KeyCode, KeyModifiers};
use tracing::debug;

use crate::app::App;
use crate::config::Config;
use crate::sequence::BlockInstance;

/// Single-line text input with a cursor measured in characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    pub value: String,
    pub cursor: usize,
}

impl TextInput {
    /// Input pre-filled with `value`, cursor at the end.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    fn len(&self) -> usize {
        self.value.chars().count()
    }

    fn byte_index(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Backspace. Returns true if the value changed.
    pub fn delete_char_before(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
        true
    }

    /// Delete key. Returns true if the value changed.
    pub fn delete_char_at(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
        true
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        if self.cursor < self.len() {
            self.cursor += 1;
        }
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.len();
    }

    /// Apply an editing key. Returns true if the value changed.
    pub fn handle_key(&mut self, key_code: KeyCode) -> bool {
        match key_code {
            KeyCode::Char(c) => {
                self.insert_char(c);
                true
            }
            KeyCode::Backspace => self.delete_char_before(),
            KeyCode::Delete => self.delete_char_at(),
            KeyCode::Left => {
                self.cursor_left();
                false
            }
            KeyCode::Right => {
                self.cursor_right();
                false
            }
            KeyCode::Home => {
                self.cursor_home();
                false
            }
            KeyCode::End => {
                self.cursor_end();
                false
            }
            _ => false,
        }
    }
}

/// The modal currently covering the panels, if any.
#[derive(Debug, Clone)]
pub enum Modal {
    NewDefinition(NewDefinitionState),
    InsertPicker(InsertPickerState),
    FilePrompt(FilePromptState),
}

/// Which field is focused in the new definition modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewDefinitionField {
    Name,
    Params,
    Template,
    SaveButton,
    CancelButton,
}

impl NewDefinitionField {
    pub fn next(self) -> Self {
        match self {
            Self::Name => Self::Params,
            Self::Params => Self::Template,
            Self::Template => Self::SaveButton,
            Self::SaveButton => Self::CancelButton,
            Self::CancelButton => Self::Name,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Name => Self::CancelButton,
            Self::Params => Self::Name,
            Self::Template => Self::Params,
            Self::SaveButton => Self::Template,
            Self::CancelButton => Self::SaveButton,
        }
    }
}

/// State for the new definition modal.
#[derive(Debug, Clone)]
pub struct NewDefinitionState {
    pub focus: NewDefinitionField,
    pub name: TextInput,
    /// Pipe-delimited parameter names, e.g. `path|mode`.
    pub params: TextInput,
    pub template: TextInput,
    /// Error from the last save attempt.
    pub error: Option<String>,
}

impl NewDefinitionState {
    pub fn new() -> Self {
        Self {
            focus: NewDefinitionField::Name,
            name: TextInput::default(),
            params: TextInput::default(),
            template: TextInput::default(),
            error: None,
        }
    }

    /// The text input under focus, if focus is on a text field.
    pub fn focused_input(&mut self) -> Option<&mut TextInput> {
        match self.focus {
            NewDefinitionField::Name => Some(&mut self.name),
            NewDefinitionField::Params => Some(&mut self.params),
            NewDefinitionField::Template => Some(&mut self.template),
            _ => None,
        }
    }
}

/// State for the picker listing definitions to insert at a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPickerState {
    /// Sequence index the chosen definition will be inserted at.
    pub position: usize,
    pub selected: usize,
}

impl InsertPickerState {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            selected: 0,
        }
    }
}

/// File operations reachable from the main screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    ImportDefinitions,
    ExportDefinitions,
    SaveProgress,
    LoadProgress,
}

impl FileAction {
    pub fn title(self) -> &'static str {
        match self {
            Self::ImportDefinitions => "Import definitions",
            Self::ExportDefinitions => "Export definitions",
            Self::SaveProgress => "Save progress",
            Self::LoadProgress => "Load progress",
        }
    }

    pub fn error_title(self) -> &'static str {
        match self {
            Self::ImportDefinitions => "Import failed",
            Self::ExportDefinitions => "Export failed",
            Self::SaveProgress => "Save failed",
            Self::LoadProgress => "Load failed",
        }
    }
}

/// State for the file path prompt.
#[derive(Debug, Clone)]
pub struct FilePromptState {
    pub action: FileAction,
    pub path: TextInput,
    pub error: Option<String>,
}

impl FilePromptState {
    pub fn new(action: FileAction, default_path: &str) -> Self {
        Self {
            action,
            path: TextInput::with_value(default_path),
            error: None,
        }
    }
}

/// Inline editing of one instance's parameter values.
///
/// Every keystroke is written straight into the instance, so all list entries
/// sharing that instance and the preview update together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamEditState {
    pub instance_index: usize,
    pub params: Vec<String>,
    pub param_index: usize,
    pub input: TextInput,
}

impl ParamEditState {
    /// Start on the first parameter. Returns `None` for parameterless blocks.
    pub fn new(instance_index: usize, instance: &BlockInstance) -> Option<Self> {
        let params = instance.definition.params.clone();
        let first = params.first()?;
        let input = TextInput::with_value(instance.value(first));
        Some(Self {
            instance_index,
            params,
            param_index: 0,
            input,
        })
    }

    pub fn current_param(&self) -> &str {
        &self.params[self.param_index]
    }

    fn move_to(&mut self, param_index: usize, instance: &BlockInstance) {
        self.param_index = param_index;
        self.input = TextInput::with_value(instance.value(&self.params[param_index]));
    }

    pub fn focus_next(&mut self, instance: &BlockInstance) {
        let next = (self.param_index + 1) % self.params.len();
        self.move_to(next, instance);
    }

    pub fn focus_prev(&mut self, instance: &BlockInstance) {
        let prev = (self.param_index + self.params.len() - 1) % self.params.len();
        self.move_to(prev, instance);
    }
}

/// Handle keyboard input for the new definition modal.
pub fn handle_new_definition_input(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    let Some(Modal::NewDefinition(state)) = &mut app.modal else {
        return;
    };

    if state.error.is_some() && key_code != KeyCode::Esc {
        state.error = None;
    }

    match key_code {
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => {
            state.focus = state.focus.prev();
        }
        KeyCode::Tab => {
            state.focus = state.focus.next();
        }
        KeyCode::BackTab => {
            state.focus = state.focus.prev();
        }
        KeyCode::Esc => {
            app.modal = None;
        }
        KeyCode::Enter => match state.focus {
            NewDefinitionField::SaveButton => {
                let name = state.name.value.clone();
                let params = state.params.value.clone();
                let template = state.template.value.clone();
                match app.create_definition(&name, &params, &template) {
                    Ok(()) => {
                        debug!(name = %name, "new_definition_saved");
                        app.modal = None;
                    }
                    Err(e) => {
                        if let Some(Modal::NewDefinition(state)) = &mut app.modal {
                            state.error = Some(e);
                        }
                    }
                }
            }
            NewDefinitionField::CancelButton => {
                app.modal = None;
            }
            _ => {
                state.focus = state.focus.next();
            }
        },
        KeyCode::Up => state.focus = state.focus.prev(),
        KeyCode::Down => state.focus = state.focus.next(),
        KeyCode::Left | KeyCode::Right
            if matches!(
                state.focus,
                NewDefinitionField::SaveButton | NewDefinitionField::CancelButton
            ) =>
        {
            state.focus = match state.focus {
                NewDefinitionField::SaveButton => NewDefinitionField::CancelButton,
                _ => NewDefinitionField::SaveButton,
            };
        }
        other => {
            if let Some(input) = state.focused_input() {
                input.handle_key(other);
            }
        }
    }
}

/// Handle keyboard input for the insert picker.
pub fn handle_insert_picker_input(app: &mut App, key_code: KeyCode) {
    let Some(Modal::InsertPicker(state)) = &mut app.modal else {
        return;
    };

    match key_code {
        KeyCode::Esc => {
            app.modal = None;
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.selected = state.selected.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if state.selected + 1 < app.registry.len() {
                state.selected += 1;
            }
        }
        KeyCode::Enter => {
            let (definition, position) = (state.selected, state.position);
            app.modal = None;
            app.add_definition_at(definition, Some(position));
        }
        _ => {}
    }
}

/// Handle keyboard input for the file path prompt.
pub fn handle_file_prompt_input(app: &mut App, key_code: KeyCode) {
    let Some(Modal::FilePrompt(state)) = &mut app.modal else {
        return;
    };

    if state.error.is_some() && key_code != KeyCode::Esc {
        state.error = None;
    }

    match key_code {
        KeyCode::Esc => {
            app.modal = None;
        }
        KeyCode::Enter => {
            let raw = state.path.value.trim();
            if raw.is_empty() {
                state.error = Some("Path cannot be empty".to_string());
                return;
            }
            let action = state.action;
            let path = Config::expand_tilde(raw);
            app.modal = None;
            app.run_file_action(action, &path);
        }
        other => {
            state.path.handle_key(other);
        }
    }
}

/// Handle keyboard input while editing an instance's parameters.
pub fn handle_param_edit_input(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    let Some(state) = &mut app.param_edit else {
        return;
    };
    let Some(instance) = app.sequence.get(state.instance_index) else {
        app.param_edit = None;
        return;
    };

    match key_code {
        KeyCode::Esc | KeyCode::Enter => {
            app.param_edit = None;
        }
        KeyCode::Tab if modifiers.contains(KeyModifiers::SHIFT) => {
            state.focus_prev(&instance.borrow());
        }
        KeyCode::Tab | KeyCode::Down => {
            state.focus_next(&instance.borrow());
        }
        KeyCode::BackTab | KeyCode::Up => {
            state.focus_prev(&instance.borrow());
        }
        other => {
            if state.input.handle_key(other) {
                let index = state.instance_index;
                let param = state.current_param().to_string();
                let value = state.input.value.clone();
                app.set_param_value(index, &param, &value);
            }
        }
    }
}

/// Dispatch a key to whichever modal is open.
pub fn handle_modal_input(app: &mut App, key_code: KeyCode, modifiers: KeyModifiers) {
    match app.modal {
        Some(Modal::NewDefinition(_)) => handle_new_definition_input(app, key_code, modifiers),
        Some(Modal::InsertPicker(_)) => handle_insert_picker_input(app, key_code),
        Some(Modal::FilePrompt(_)) => handle_file_prompt_input(app, key_code),
        None => {}
    }
}
