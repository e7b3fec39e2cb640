//! Frame rendering for every wizard phase

use console::{style, truncate_str};

use super::app::{App, Execution, ModuleSelection, Phase, UploadState};
use super::form::ConfigForm;
use crate::engine::Module;

/// Cells in the progress bar
pub const BAR_WIDTH: usize = 71;

/// Debug messages shown under a run
const DEBUG_LINES: usize = 8;

const GRADIENT_START: (u8, u8, u8) = (0xB1, 0x4F, 0xFF);
const GRADIENT_END: (u8, u8, u8) = (0x00, 0xFF, 0xA3);

pub fn render(app: &App, width: usize) -> String {
    let title = format!("  {}", style("scoutdoc").bold().magenta());
    let mut lines = vec![String::new(), title, String::new()];

    let help = match &app.phase {
        Phase::Configuring(form) => {
            configuring(form, &mut lines);
            "up/down/tab: move • enter: save • esc: quit"
        }
        Phase::ModuleSelecting(selection) => {
            selecting(selection, &mut lines);
            "up/down: move • space: toggle • enter: review • q: quit"
        }
        Phase::ReviewingSubmodules(selection) => {
            let reports_dir = app.config.reports_dir().display().to_string();
            reviewing(selection, &reports_dir, &mut lines);
            "enter: run • q: quit"
        }
        Phase::Executing(execution) => {
            running("Running modules", execution, &mut lines);
            "q: quit"
        }
        Phase::Done(execution) => {
            running("Finished", execution, &mut lines);
            upload_line(&execution.upload, &mut lines);
            "u: upload to Pwndoc • q: quit"
        }
    };

    if let Some(notice) = &app.notice {
        lines.push(String::new());
        lines.push(format!("  {}", style(notice).yellow()));
    }
    lines.push(String::new());
    lines.push(format!("  {}", style(help).dim()));

    let width = width.max(20);
    lines
        .iter()
        .map(|line| truncate_str(line, width, "…").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

fn configuring(form: &ConfigForm, lines: &mut Vec<String>) {
    lines.push(format!("  {}", style("Configure scoutdoc").bold()));
    lines.push(String::new());

    for (label, value, focused) in form.rows() {
        let cursor = if focused { style("❯").cyan().to_string() } else { " ".to_string() };
        let value = if focused {
            format!("{}{}", style(value).underlined(), style("█").dim())
        } else {
            value
        };
        lines.push(format!("  {cursor} {} {value}", style(format!("{label:<30}")).dim()));
    }

    if let Some(error) = form.error() {
        lines.push(String::new());
        lines.push(format!("  {} {}", style("✗").red(), style(error).red()));
    }
}

fn selecting(selection: &ModuleSelection, lines: &mut Vec<String>) {
    lines.push(format!("  {}", style("Select modules").bold()));
    lines.push(String::new());

    for (position, module) in selection.catalog.iter().enumerate() {
        let focused = position == selection.cursor;
        let cursor = if focused { style("❯").cyan().to_string() } else { " ".to_string() };
        let checkbox = if module.selected {
            style("[x]").green().to_string()
        } else {
            "[ ]".to_string()
        };
        let name = if focused {
            style(&module.name).bold().to_string()
        } else {
            module.name.clone()
        };
        lines.push(format!("  {cursor} {checkbox} {name}"));
        if focused {
            lines.push(format!("        {}", style(module.definition.description).dim()));
        }
    }
}

fn reviewing(selection: &ModuleSelection, reports_dir: &str, lines: &mut Vec<String>) {
    lines.push(format!("  {}", style("Ready to run").bold()));
    lines.push(String::new());

    for module in selection.catalog.selected() {
        lines.push(format!("  {} {}", style("•").cyan(), module.name));
        lines.push(format!("    {}", style(module.definition.description).dim()));
    }
    lines.push(String::new());
    lines.push(format!("  {} {}", style("Reports:").dim(), reports_dir));
}

fn running(title: &str, execution: &Execution, lines: &mut Vec<String>) {
    lines.push(format!("  {}", style(title).bold()));
    lines.push(String::new());
    lines.push(format!("  {}", progress_bar(execution.bar.shown(), BAR_WIDTH)));
    lines.push(String::new());

    for module in execution.aggregator.catalog().selected() {
        lines.push(format!("  {}", module_line(module)));
    }

    let log: Vec<&str> = execution.aggregator.debug_log().rev().take(DEBUG_LINES).collect();
    if !log.is_empty() {
        lines.push(String::new());
        lines.push(format!("  {}", style("Debug").dim().underlined()));
        for message in log.into_iter().rev() {
            lines.push(format!("  {}", style(message).dim()));
        }
    }
}

fn upload_line(upload: &UploadState, lines: &mut Vec<String>) {
    let text = match upload {
        UploadState::Idle => return,
        UploadState::Running => style("Uploading to Pwndoc…".to_string()).cyan(),
        UploadState::Finished(summary) => style(summary.clone()).green(),
    };
    lines.push(String::new());
    lines.push(format!("  {text}"));
}

/// Status line of one module
pub fn module_line(module: &Module) -> String {
    let name = style(&module.name).bold();

    if module.errored {
        format!("{} {}: {}", style("✗").red(), name, style(&module.status).red())
    } else if module.complete {
        let found = match module.affected_assets.len() {
            0 => "no affected assets".to_string(),
            1 => "1 affected asset".to_string(),
            n => format!("{n} affected assets"),
        };
        format!("{} {}: {}", style("✓").green(), name, found)
    } else if module.total == 0 {
        format!("{} {}: {}", style("…").yellow(), name, style("waiting").dim())
    } else {
        format!(
            "{} {}: {}/{} {}",
            style("►").cyan(),
            name,
            module.checked,
            module.total,
            style(&module.status).dim()
        )
    }
}

/// Gradient bar with a trailing percentage
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = ((fraction * width as f64).round() as usize).min(width);

    let mut bar = String::new();
    for cell in 0..width {
        if cell < filled {
            bar.push_str(&style("█").color256(gradient_color(cell, width)).to_string());
        } else {
            bar.push_str(&style("░").dim().to_string());
        }
    }
    format!("{bar} {:>3.0}%", fraction * 100.0)
}

/// xterm-256 colour of a bar cell along the gradient
pub fn gradient_color(cell: usize, width: usize) -> u8 {
    let t = if width > 1 {
        cell as f64 / (width - 1) as f64
    } else {
        0.0
    };
    let mix = |from: u8, to: u8| from as f64 + (to as f64 - from as f64) * t;

    let (r, g, b) = (
        mix(GRADIENT_START.0, GRADIENT_END.0),
        mix(GRADIENT_START.1, GRADIENT_END.1),
        mix(GRADIENT_START.2, GRADIENT_END.2),
    );
    let level = |channel: f64| (channel / 255.0 * 5.0).round() as u8;
    16 + 36 * level(r) + 6 * level(g) + level(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WizardConfig;
    use crate::engine::ModuleEvent;
    use crate::engine::catalog::{ACCESS_KEY_AGE, AffectedAsset, ModuleCatalog};
    use crate::tui::app::Input;
    use crate::tui::terminal::KeyInput;
    use console::strip_ansi_codes;

    fn module() -> Module {
        let mut catalog = ModuleCatalog::builtin();
        catalog.select(ACCESS_KEY_AGE, true);
        catalog.get(ACCESS_KEY_AGE).unwrap().clone()
    }

    fn plain(text: &str) -> String {
        strip_ansi_codes(text).to_string()
    }

    #[test]
    fn test_module_line_states() {
        let mut m = module();
        assert!(plain(&module_line(&m)).ends_with("waiting"));

        m.total = 4;
        m.checked = 1;
        m.status = "Checking AKIA1".to_string();
        assert!(plain(&module_line(&m)).contains("1/4 Checking AKIA1"));

        m.complete = true;
        m.affected_assets.clear();
        assert!(plain(&module_line(&m)).ends_with("no affected assets"));

        m.affected_assets = vec![AffectedAsset::new("a", "x"), AffectedAsset::new("b", "y")];
        assert!(plain(&module_line(&m)).ends_with("2 affected assets"));

        m.errored = true;
        m.status = "query failed".to_string();
        let line = plain(&module_line(&m));
        assert!(line.starts_with("✗") && line.ends_with("query failed"));
    }

    #[test]
    fn test_render_keeps_error_after_later_progress() {
        let mut app = App::new(WizardConfig::default(), false);
        let progress = |checked, status: &str| {
            Input::Module(ModuleEvent::Progress {
                module: ACCESS_KEY_AGE.to_string(),
                checked,
                total: 2,
                status: status.to_string(),
            })
        };
        for input in [
            Input::Key(KeyInput::Char(' ')),
            Input::Key(KeyInput::Enter),
            Input::Key(KeyInput::Enter),
            progress(0, "Counting"),
            Input::Module(ModuleEvent::Error {
                module: ACCESS_KEY_AGE.to_string(),
                message: "query failed".to_string(),
            }),
            progress(1, "Checking AKIA1"),
            Input::Module(ModuleEvent::Complete {
                module: ACCESS_KEY_AGE.to_string(),
            }),
        ] {
            app = app.update(input).0;
        }

        let frame = plain(&render(&app, 120));
        assert!(frame.contains("✗ Access Key Age/Last Used: query failed"));
        assert!(!frame.contains("Checking AKIA1"));
    }

    #[test]
    fn test_progress_bar_cells_and_percentage() {
        let bar = plain(&progress_bar(0.5, BAR_WIDTH));
        assert_eq!(bar.chars().filter(|&c| c == '█').count(), 36);
        assert_eq!(bar.chars().filter(|&c| c == '░').count(), BAR_WIDTH - 36);
        assert!(bar.ends_with(" 50%"));

        assert!(plain(&progress_bar(1.0, 10)).ends_with("100%"));
        assert!(!plain(&progress_bar(0.0, 10)).contains('█'));
    }

    #[test]
    fn test_gradient_endpoints() {
        assert_eq!(gradient_color(0, BAR_WIDTH), 141);
        assert_eq!(gradient_color(BAR_WIDTH - 1, BAR_WIDTH), 49);
    }

    #[test]
    fn test_render_finished_run_without_findings() {
        let app = App::new(WizardConfig::default(), false);
        let mut app = app;
        for input in [
            Input::Key(KeyInput::Char(' ')),
            Input::Key(KeyInput::Enter),
            Input::Key(KeyInput::Enter),
            Input::Module(ModuleEvent::Progress {
                module: ACCESS_KEY_AGE.to_string(),
                checked: 0,
                total: 0,
                status: String::new(),
            }),
            Input::Module(ModuleEvent::Debug {
                message: "Found 1 reports".to_string(),
            }),
            Input::Module(ModuleEvent::Complete {
                module: ACCESS_KEY_AGE.to_string(),
            }),
        ] {
            app = app.update(input).0;
        }

        let frame = plain(&render(&app, 120));
        assert!(frame.contains("Finished"));
        assert!(frame.contains("Access Key Age/Last Used: no affected assets"));
        assert!(frame.contains("Found 1 reports"));
        assert!(frame.contains("u: upload to Pwndoc"));
    }

    #[test]
    fn test_render_configuring_masks_secrets() {
        let config = WizardConfig {
            pwndoc_password: "hunter2".to_string(),
            ..WizardConfig::default()
        };
        let frame = plain(&render(&App::new(config, true), 120));
        assert!(frame.contains("Configure scoutdoc"));
        assert!(frame.contains("*******"));
        assert!(!frame.contains("hunter2"));
    }
}
