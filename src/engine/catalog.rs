//! Static module catalog and per-module run state

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

/// A resource flagged by a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffectedAsset {
    pub id: String,
    pub name: String,
}

impl AffectedAsset {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// How a module produces its results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleProcedure {
    /// Query every discovered report and resolve two detail fields per finding
    ReportScan {
        finding_query: &'static str,
        id_field: &'static str,
        name_field: &'static str,
    },
    /// Fixed number of timed iterations without report access
    Simulated { iterations: usize, delay: Duration },
}

/// Placeholder tokens substituted in the report narrative and finding templates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeTokens {
    pub amount: &'static str,
    pub assets: &'static str,
    pub screenshot: &'static str,
}

/// Static description of a selectable check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDefinition {
    /// Stable identifier used on the command line
    pub id: &'static str,
    /// Display name, also the event routing key
    pub name: &'static str,
    pub description: &'static str,
    pub procedure: ModuleProcedure,
    pub tokens: NarrativeTokens,
    /// Title of the vulnerability template used to create the finding
    pub finding_template: &'static str,
    /// File stem for the screenshot input and output files
    pub screenshot_stem: &'static str,
}

pub const ACCESS_KEY_AGE: &str = "Access Key Age/Last Used";
pub const OPEN_BUCKETS: &str = "Open S3 Buckets (Authenticated/Anonymous)";

/// Every module the wizard knows about, in display order
pub fn builtin_modules() -> Vec<ModuleDefinition> {
    vec![
        ModuleDefinition {
            id: "access-key-age",
            name: ACCESS_KEY_AGE,
            description: "Active IAM access keys that have not been rotated in 90 days",
            procedure: ModuleProcedure::ReportScan {
                finding_query: ".services.iam.findings[\"iam-user-no-Active-key-rotation\"].items",
                id_field: "AccessKeyId",
                name_field: "UserName",
            },
            tokens: NarrativeTokens {
                amount: "%KEYS_AGE_AMOUNT%",
                assets: "%KEYS_AGE_ASSETS%",
                screenshot: "%KEYS_AGE_SCREENSHOT%",
            },
            finding_template: "Access Keys Older than 90 Days",
            screenshot_stem: "accesskeyage",
        },
        ModuleDefinition {
            id: "open-buckets",
            name: OPEN_BUCKETS,
            description: "S3 buckets readable by authenticated or anonymous principals",
            procedure: ModuleProcedure::Simulated {
                iterations: 4,
                delay: Duration::from_secs(1),
            },
            tokens: NarrativeTokens {
                amount: "%OPEN_S3_AMOUNT%",
                assets: "%OPEN_S3_ASSETS%",
                screenshot: "%OPEN_S3_SCREENSHOT%",
            },
            finding_template: "Publicly Accessible S3 Buckets",
            screenshot_stem: "opens3",
        },
    ]
}

/// Run state of one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    #[serde(skip)]
    pub definition: ModuleDefinition,
    pub name: String,
    pub selected: bool,
    pub checked: usize,
    /// 0 until the module has counted its work
    pub total: usize,
    pub complete: bool,
    pub errored: bool,
    pub status: String,
    pub affected_assets: Vec<AffectedAsset>,
}

impl Module {
    pub fn new(definition: ModuleDefinition) -> Self {
        Self {
            name: definition.name.to_string(),
            definition,
            selected: false,
            checked: 0,
            total: 0,
            complete: false,
            errored: false,
            status: String::new(),
            affected_assets: Vec::new(),
        }
    }

    /// Clear results before a run; unselected modules count as already complete
    pub fn reset(&mut self) {
        self.checked = 0;
        self.total = 0;
        self.complete = !self.selected;
        self.errored = false;
        self.status.clear();
        self.affected_assets.clear();
    }
}

/// Ordered map of modules keyed by name
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: Vec<Module>,
    index: HashMap<String, usize>,
}

impl ModuleCatalog {
    pub fn new(definitions: Vec<ModuleDefinition>) -> Self {
        let mut catalog = Self::default();
        for definition in definitions {
            catalog.insert(Module::new(definition));
        }
        catalog
    }

    pub fn builtin() -> Self {
        Self::new(builtin_modules())
    }

    fn insert(&mut self, module: Module) {
        match self.index.get(&module.name) {
            Some(&slot) => self.modules[slot] = module,
            None => {
                self.index.insert(module.name.clone(), self.modules.len());
                self.modules.push(module);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.index.get(name).map(|&slot| &self.modules[slot])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Module> {
        self.index.get(name).map(|&slot| &mut self.modules[slot])
    }

    /// Look a module up by its command-line id
    pub fn find_by_id(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.definition.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn selected(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().filter(|m| m.selected)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module at a display position
    pub fn at(&self, position: usize) -> Option<&Module> {
        self.modules.get(position)
    }

    pub fn toggle_at(&mut self, position: usize) {
        if let Some(module) = self.modules.get_mut(position) {
            module.selected = !module.selected;
        }
    }

    pub fn select(&mut self, name: &str, selected: bool) -> bool {
        match self.get_mut(name) {
            Some(module) => {
                module.selected = selected;
                true
            }
            None => false,
        }
    }

    pub fn has_selection(&self) -> bool {
        self.modules.iter().any(|m| m.selected)
    }

    pub fn reset_for_run(&mut self) {
        self.modules.iter_mut().for_each(Module::reset);
    }
}
