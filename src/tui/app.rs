//! Wizard state machine
//!
//! [`App::update`] is a pure transition: it consumes the current state and one
//! input and returns the next state plus the side effects the driver must run.

use std::path::PathBuf;

use super::animation::ProgressAnimation;
use super::form::{ConfigForm, FormOutcome};
use super::terminal::KeyInput;
use crate::config::WizardConfig;
use crate::engine::{Aggregator, Module, ModuleCatalog, ModuleDefinition, ModuleEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Key(KeyInput),
    Module(ModuleEvent),
    Tick,
    ConfigSaved,
    ConfigFailed(String),
    /// Summary line or error message from the upload pipeline
    UploadFinished(Result<String, String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SaveConfig(WizardConfig),
    StartModules {
        modules: Vec<ModuleDefinition>,
        report_root: PathBuf,
    },
    StartUpload {
        config: WizardConfig,
        modules: Vec<Module>,
    },
    Quit,
}

#[derive(Debug, Clone)]
pub struct ModuleSelection {
    pub catalog: ModuleCatalog,
    pub cursor: usize,
}

impl ModuleSelection {
    pub fn new(catalog: ModuleCatalog) -> Self {
        Self { catalog, cursor: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Running,
    Finished(String),
}

#[derive(Debug, Clone)]
pub struct Execution {
    pub aggregator: Aggregator,
    pub bar: ProgressAnimation,
    pub animating: bool,
    pub upload: UploadState,
}

impl Execution {
    fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator,
            bar: ProgressAnimation::default(),
            animating: true,
            upload: UploadState::Idle,
        }
    }

    /// Fraction the bar moves toward
    pub fn target(&self) -> f64 {
        let progress = self.aggregator.progress();
        if self.aggregator.all_done() && progress.total == 0 {
            1.0
        } else {
            progress.fraction()
        }
    }

    fn tick(&mut self) {
        if !self.animating {
            return;
        }
        let moving = self.bar.step(self.target());
        self.animating = moving || !self.aggregator.is_settled();
    }

    fn apply(&mut self, event: ModuleEvent) {
        self.aggregator.apply(event);
        self.animating = true;
    }
}

#[derive(Debug, Clone)]
pub enum Phase {
    Configuring(ConfigForm),
    ModuleSelecting(ModuleSelection),
    ReviewingSubmodules(ModuleSelection),
    Executing(Execution),
    Done(Execution),
}

#[derive(Debug, Clone)]
pub struct App {
    pub config: WizardConfig,
    pub phase: Phase,
    /// One-line message shown under the current view
    pub notice: Option<String>,
    pub quitting: bool,
}

impl App {
    pub fn new(config: WizardConfig, configure_first: bool) -> Self {
        let phase = if configure_first {
            Phase::Configuring(ConfigForm::new(&config))
        } else {
            Phase::ModuleSelecting(ModuleSelection::new(ModuleCatalog::builtin()))
        };

        Self {
            config,
            phase,
            notice: None,
            quitting: false,
        }
    }

    fn is_quit_key(&self, key: KeyInput) -> bool {
        match key {
            KeyInput::Escape | KeyInput::CtrlC => true,
            // 'q' is text while a form field has focus
            KeyInput::Char('q') => !matches!(self.phase, Phase::Configuring(_)),
            _ => false,
        }
    }

    pub fn update(mut self, input: Input) -> (Self, Vec<Effect>) {
        let mut effects = Vec::new();

        match input {
            Input::Key(key) if self.is_quit_key(key) => {
                self.quitting = true;
                effects.push(Effect::Quit);
                return (self, effects);
            }
            Input::ConfigSaved => {
                self.notice = Some("Configuration saved".to_string());
                return (self, effects);
            }
            Input::ConfigFailed(reason) => {
                self.notice = Some(format!("Could not save configuration: {reason}"));
                return (self, effects);
            }
            _ => {}
        }

        self.phase = match self.phase {
            Phase::Configuring(form) => {
                configuring(form, input, &mut self.config, &mut self.notice, &mut effects)
            }
            Phase::ModuleSelecting(selection) => selecting(selection, input, &mut self.notice),
            Phase::ReviewingSubmodules(selection) => {
                reviewing(selection, input, &self.config, &mut effects)
            }
            Phase::Executing(execution) => executing(execution, input),
            Phase::Done(execution) => done(execution, input, &self.config, &mut effects),
        };

        (self, effects)
    }
}

fn configuring(
    mut form: ConfigForm,
    input: Input,
    config: &mut WizardConfig,
    notice: &mut Option<String>,
    effects: &mut Vec<Effect>,
) -> Phase {
    let Input::Key(key) = input else {
        return Phase::Configuring(form);
    };

    match form.handle(key) {
        FormOutcome::Editing => Phase::Configuring(form),
        FormOutcome::Submitted(submitted) => {
            *config = submitted.clone();
            *notice = None;
            effects.push(Effect::SaveConfig(submitted));
            Phase::ModuleSelecting(ModuleSelection::new(ModuleCatalog::builtin()))
        }
    }
}

fn selecting(mut selection: ModuleSelection, input: Input, notice: &mut Option<String>) -> Phase {
    let Input::Key(key) = input else {
        return Phase::ModuleSelecting(selection);
    };

    match key {
        KeyInput::Up | KeyInput::Char('k') => {
            selection.cursor = selection.cursor.saturating_sub(1);
        }
        KeyInput::Down | KeyInput::Char('j') => {
            let last = selection.catalog.len().saturating_sub(1);
            selection.cursor = (selection.cursor + 1).min(last);
        }
        KeyInput::Char(' ') | KeyInput::Char('x') => {
            selection.catalog.toggle_at(selection.cursor);
            *notice = None;
        }
        KeyInput::Enter => {
            if selection.catalog.has_selection() {
                *notice = None;
                return Phase::ReviewingSubmodules(selection);
            }
            *notice = Some("Select at least one module with space".to_string());
        }
        _ => {}
    }

    Phase::ModuleSelecting(selection)
}

fn reviewing(
    selection: ModuleSelection,
    input: Input,
    config: &WizardConfig,
    effects: &mut Vec<Effect>,
) -> Phase {
    match input {
        Input::Key(KeyInput::Enter) => {
            let mut aggregator = Aggregator::new(selection.catalog);
            aggregator.start_run();

            let modules = aggregator
                .catalog()
                .selected()
                .map(|m| m.definition.clone())
                .collect();
            effects.push(Effect::StartModules {
                modules,
                report_root: config.reports_dir(),
            });
            Phase::Executing(Execution::new(aggregator))
        }
        _ => Phase::ReviewingSubmodules(selection),
    }
}

fn executing(mut execution: Execution, input: Input) -> Phase {
    match input {
        Input::Module(event) => {
            execution.apply(event);
            if execution.aggregator.all_done() {
                return Phase::Done(execution);
            }
        }
        Input::Tick => execution.tick(),
        _ => {}
    }
    Phase::Executing(execution)
}

fn done(
    mut execution: Execution,
    input: Input,
    config: &WizardConfig,
    effects: &mut Vec<Effect>,
) -> Phase {
    match input {
        Input::Module(event) => execution.apply(event),
        Input::Tick => execution.tick(),
        Input::Key(KeyInput::Char('u')) => {
            if execution.upload == UploadState::Idle {
                execution.upload = UploadState::Running;
                effects.push(Effect::StartUpload {
                    config: config.clone(),
                    modules: execution.aggregator.catalog().selected().cloned().collect(),
                });
            }
        }
        Input::UploadFinished(outcome) => {
            execution.upload = UploadState::Finished(match outcome {
                Ok(summary) => summary,
                Err(reason) => format!("Upload failed: {reason}"),
            });
        }
        _ => {}
    }
    Phase::Done(execution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::catalog::{ACCESS_KEY_AGE, AffectedAsset, OPEN_BUCKETS};

    fn key(c: char) -> Input {
        Input::Key(KeyInput::Char(c))
    }

    fn feed(app: App, inputs: Vec<Input>) -> (App, Vec<Effect>) {
        let mut all = Vec::new();
        let mut app = app;
        for input in inputs {
            let (next, effects) = app.update(input);
            app = next;
            all.extend(effects);
        }
        (app, all)
    }

    fn module_event(event: ModuleEvent) -> Input {
        Input::Module(event)
    }

    fn complete(module: &str) -> Input {
        module_event(ModuleEvent::Complete {
            module: module.to_string(),
        })
    }

    /// Select the first module and start the run
    fn executing_app() -> (App, Vec<Effect>) {
        let app = App::new(WizardConfig::default(), false);
        feed(
            app,
            vec![key(' '), Input::Key(KeyInput::Enter), Input::Key(KeyInput::Enter)],
        )
    }

    #[test]
    fn test_initial_phase() {
        let first_run = App::new(WizardConfig::default(), true);
        assert!(matches!(first_run.phase, Phase::Configuring(_)));
        let configured = App::new(WizardConfig::default(), false);
        assert!(matches!(configured.phase, Phase::ModuleSelecting(_)));
    }

    #[test]
    fn test_quit_keys() {
        for quit in [key('q'), Input::Key(KeyInput::Escape), Input::Key(KeyInput::CtrlC)] {
            let (app, effects) = App::new(WizardConfig::default(), false).update(quit);
            assert!(app.quitting);
            assert_eq!(effects, vec![Effect::Quit]);
        }

        let (app, effects) = executing_app().0.update(key('q'));
        assert!(app.quitting);
        assert_eq!(effects, vec![Effect::Quit]);
    }

    #[test]
    fn test_q_is_text_in_configuring() {
        let app = App::new(WizardConfig::default(), true);
        let (app, effects) = app.update(key('q'));
        assert!(!app.quitting);
        assert!(effects.is_empty());

        let (app, effects) = app.update(Input::Key(KeyInput::Escape));
        assert!(app.quitting);
        assert_eq!(effects, vec![Effect::Quit]);
    }

    #[test]
    fn test_config_submit_saves_and_moves_on() {
        let app = App::new(WizardConfig::default(), true);
        let (app, effects) = app.update(Input::Key(KeyInput::Enter));

        assert!(matches!(app.phase, Phase::ModuleSelecting(_)));
        assert_eq!(effects, vec![Effect::SaveConfig(WizardConfig::default())]);

        let (app, _) = app.update(Input::ConfigFailed("disk full".to_string()));
        assert_eq!(app.notice.as_deref(), Some("Could not save configuration: disk full"));
    }

    #[test]
    fn test_enter_requires_a_selection() {
        let app = App::new(WizardConfig::default(), false);
        let (app, effects) = app.update(Input::Key(KeyInput::Enter));
        assert!(matches!(app.phase, Phase::ModuleSelecting(_)));
        assert!(effects.is_empty());
        assert!(app.notice.is_some());
    }

    #[test]
    fn test_review_then_start_modules() {
        let app = App::new(WizardConfig::default(), false);
        let (app, effects) = feed(
            app,
            vec![Input::Key(KeyInput::Down), key('x'), Input::Key(KeyInput::Enter)],
        );
        assert!(matches!(app.phase, Phase::ReviewingSubmodules(_)));
        assert!(effects.is_empty());

        let (app, effects) = app.update(Input::Key(KeyInput::Enter));
        assert!(matches!(app.phase, Phase::Executing(_)));
        match &effects[..] {
            [Effect::StartModules { modules, report_root }] => {
                assert_eq!(modules.len(), 1);
                assert_eq!(modules[0].name, OPEN_BUCKETS);
                assert_eq!(report_root, &WizardConfig::default().reports_dir());
            }
            other => panic!("unexpected effects {other:?}"),
        }
    }

    #[test]
    fn test_phases_never_step_backward() {
        let app = App::new(WizardConfig::default(), false);
        let (app, effects) = feed(app, vec![key('c'), Input::Key(KeyInput::Backspace)]);
        assert!(matches!(app.phase, Phase::ModuleSelecting(_)));
        assert!(effects.is_empty());

        let (app, effects) = feed(
            app,
            vec![key(' '), Input::Key(KeyInput::Enter), key('b'), Input::Key(KeyInput::Backspace)],
        );
        assert!(matches!(app.phase, Phase::ReviewingSubmodules(_)));
        assert!(effects.is_empty());

        let (app, _) = feed(app, vec![Input::Key(KeyInput::Enter), complete(ACCESS_KEY_AGE)]);
        let (app, effects) =
            feed(app, vec![key('r'), Input::Key(KeyInput::Enter), key('c'), key('b')]);
        assert!(matches!(app.phase, Phase::Done(_)));
        assert!(effects.is_empty());
        assert!(!app.quitting);
    }

    #[test]
    fn test_events_drive_execution_to_done() {
        let (app, _) = executing_app();
        let (app, _) = feed(
            app,
            vec![
                module_event(ModuleEvent::Progress {
                    module: ACCESS_KEY_AGE.to_string(),
                    checked: 0,
                    total: 1,
                    status: "Counting".to_string(),
                }),
                Input::Tick,
                module_event(ModuleEvent::Progress {
                    module: ACCESS_KEY_AGE.to_string(),
                    checked: 1,
                    total: 1,
                    status: "Checking AKIA1".to_string(),
                }),
                module_event(ModuleEvent::AffectedAssetFound {
                    module: ACCESS_KEY_AGE.to_string(),
                    asset: AffectedAsset::new("AKIA1", "alice"),
                }),
            ],
        );
        assert!(matches!(app.phase, Phase::Executing(_)));

        let (mut app, _) = app.update(complete(ACCESS_KEY_AGE));
        assert!(matches!(app.phase, Phase::Done(_)));

        // The bar keeps easing toward the final fraction, then stops
        for _ in 0..500 {
            app = app.update(Input::Tick).0;
        }
        let Phase::Done(execution) = &app.phase else {
            panic!("expected done");
        };
        assert!(!execution.animating);
        assert_eq!(execution.bar.shown(), 1.0);
    }

    #[test]
    fn test_module_events_outside_a_run_are_ignored() {
        let app = App::new(WizardConfig::default(), false);
        let (app, effects) = app.update(complete(ACCESS_KEY_AGE));
        assert!(matches!(app.phase, Phase::ModuleSelecting(_)));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_upload_starts_once() {
        let (app, _) = executing_app();
        let (app, _) = app.update(complete(ACCESS_KEY_AGE));

        let (app, effects) = app.update(key('u'));
        match &effects[..] {
            [Effect::StartUpload { modules, .. }] => {
                assert_eq!(modules.len(), 1);
                assert_eq!(modules[0].name, ACCESS_KEY_AGE);
            }
            other => panic!("unexpected effects {other:?}"),
        }

        let (app, effects) = app.update(key('u'));
        assert!(effects.is_empty());

        let (app, _) = app.update(key('r'));
        assert!(matches!(app.phase, Phase::Done(_)));

        let (app, _) = app.update(Input::UploadFinished(Ok("2 findings".to_string())));
        let Phase::Done(execution) = &app.phase else {
            panic!("expected done");
        };
        assert_eq!(execution.upload, UploadState::Finished("2 findings".to_string()));
    }

    #[test]
    fn test_animation_runs_until_counters_settle() {
        let (app, _) = executing_app();
        let (app, _) = feed(
            app,
            vec![
                module_event(ModuleEvent::Progress {
                    module: ACCESS_KEY_AGE.to_string(),
                    checked: 1,
                    total: 2,
                    status: String::new(),
                }),
                module_event(ModuleEvent::Error {
                    module: ACCESS_KEY_AGE.to_string(),
                    message: "query failed".to_string(),
                }),
                complete(ACCESS_KEY_AGE),
            ],
        );

        // All modules are done but one resource was never checked
        let mut app = app;
        for _ in 0..500 {
            app = app.update(Input::Tick).0;
        }
        let Phase::Done(execution) = &app.phase else {
            panic!("expected done");
        };
        assert!(execution.aggregator.all_done());
        assert!(!execution.aggregator.is_settled());
        assert!(execution.animating);
        assert!((execution.bar.shown() - 0.5).abs() < 0.01);
    }
}
