//! Parsed module record: requests, imports and exports of one module.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ModuleRecordError;

/// A module specifier the module depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    pub source: String,
    /// Evaluation may be deferred until first use.
    pub is_lazy: bool,
}

/// `import { import_name as local_name } from request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularImport {
    pub local_name: String,
    pub import_name: String,
    pub module_request: u32,
}

/// `import * as local_name from request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceImport {
    pub local_name: String,
    pub module_request: u32,
}

/// `export { local_name as export_name }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExport {
    pub local_name: String,
    pub export_name: String,
    /// The binding is never reassigned (`const`, class, function).
    pub is_constant: bool,
}

/// `export { import_name as export_name } from request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndirectExport {
    pub export_name: String,
    pub import_name: String,
    pub module_request: u32,
}

/// `export * from request`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarExport {
    pub module_request: u32,
}

/// Import and export tables of one module.
///
/// Requests are deduplicated by source; the returned index is stable and is
/// what import and export entries refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRecord {
    requests: Vec<ModuleRequest>,
    regular_imports: Vec<RegularImport>,
    namespace_imports: Vec<NamespaceImport>,
    local_exports: Vec<LocalExport>,
    indirect_exports: Vec<IndirectExport>,
    star_exports: Vec<StarExport>,

    request_index: FxHashMap<String, u32>,
    import_locals: FxHashSet<String>,
    export_names: FxHashSet<String>,
}

impl ModuleRecord {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Construction
    // ==========================================================================

    /// Add (or find) the request for `source` and return its index.
    ///
    /// A request stays lazy only while every import of it is lazy.
    pub fn add_module_request(&mut self, source: &str, is_lazy: bool) -> u32 {
        if let Some(&index) = self.request_index.get(source) {
            self.requests[index as usize].is_lazy &= is_lazy;
            return index;
        }
        let index = self.requests.len() as u32;
        self.requests.push(ModuleRequest {
            source: source.to_owned(),
            is_lazy,
        });
        self.request_index.insert(source.to_owned(), index);
        index
    }

    pub fn add_import(
        &mut self,
        local_name: &str,
        import_name: &str,
        module_request: u32,
    ) -> Result<(), ModuleRecordError> {
        self.check_request(module_request)?;
        self.claim_import_local(local_name)?;
        self.regular_imports.push(RegularImport {
            local_name: local_name.to_owned(),
            import_name: import_name.to_owned(),
            module_request,
        });
        Ok(())
    }

    pub fn add_namespace_import(
        &mut self,
        local_name: &str,
        module_request: u32,
    ) -> Result<(), ModuleRecordError> {
        self.check_request(module_request)?;
        self.claim_import_local(local_name)?;
        self.namespace_imports.push(NamespaceImport {
            local_name: local_name.to_owned(),
            module_request,
        });
        Ok(())
    }

    /// Export a local binding. One local may be exported under several names.
    pub fn add_local_export(
        &mut self,
        local_name: &str,
        export_name: &str,
        is_constant: bool,
    ) -> Result<(), ModuleRecordError> {
        self.claim_export_name(export_name)?;
        self.local_exports.push(LocalExport {
            local_name: local_name.to_owned(),
            export_name: export_name.to_owned(),
            is_constant,
        });
        Ok(())
    }

    pub fn add_indirect_export(
        &mut self,
        export_name: &str,
        import_name: &str,
        module_request: u32,
    ) -> Result<(), ModuleRecordError> {
        self.check_request(module_request)?;
        self.claim_export_name(export_name)?;
        self.indirect_exports.push(IndirectExport {
            export_name: export_name.to_owned(),
            import_name: import_name.to_owned(),
            module_request,
        });
        Ok(())
    }

    pub fn add_star_export(&mut self, module_request: u32) -> Result<(), ModuleRecordError> {
        self.check_request(module_request)?;
        self.star_exports.push(StarExport { module_request });
        Ok(())
    }

    /// Turn local exports of imported bindings into indirect exports.
    ///
    /// `import { x } from "m"; export { x as y }` exports `y` straight from
    /// `"m"`. Namespace imports stay local exports.
    pub fn resolve_reexports(&mut self) {
        let imports: FxHashMap<&str, &RegularImport> = self
            .regular_imports
            .iter()
            .map(|import| (import.local_name.as_str(), import))
            .collect();

        let mut kept = Vec::with_capacity(self.local_exports.len());
        for export in self.local_exports.drain(..) {
            match imports.get(export.local_name.as_str()) {
                Some(import) => self.indirect_exports.push(IndirectExport {
                    export_name: export.export_name,
                    import_name: import.import_name.clone(),
                    module_request: import.module_request,
                }),
                None => kept.push(export),
            }
        }
        self.local_exports = kept;
    }

    fn check_request(&self, index: u32) -> Result<(), ModuleRecordError> {
        if (index as usize) < self.requests.len() {
            Ok(())
        } else {
            Err(ModuleRecordError::InvalidRequest {
                index,
                count: self.requests.len(),
            })
        }
    }

    fn claim_import_local(&mut self, local_name: &str) -> Result<(), ModuleRecordError> {
        if !self.import_locals.insert(local_name.to_owned()) {
            return Err(ModuleRecordError::DuplicateImport {
                local_name: local_name.to_owned(),
            });
        }
        Ok(())
    }

    fn claim_export_name(&mut self, export_name: &str) -> Result<(), ModuleRecordError> {
        if !self.export_names.insert(export_name.to_owned()) {
            return Err(ModuleRecordError::DuplicateExport {
                export_name: export_name.to_owned(),
            });
        }
        Ok(())
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    pub fn requests(&self) -> &[ModuleRequest] {
        &self.requests
    }

    pub fn request(&self, index: u32) -> Option<&ModuleRequest> {
        self.requests.get(index as usize)
    }

    pub fn regular_imports(&self) -> &[RegularImport] {
        &self.regular_imports
    }

    pub fn namespace_imports(&self) -> &[NamespaceImport] {
        &self.namespace_imports
    }

    pub fn local_exports(&self) -> &[LocalExport] {
        &self.local_exports
    }

    pub fn indirect_exports(&self) -> &[IndirectExport] {
        &self.indirect_exports
    }

    pub fn star_exports(&self) -> &[StarExport] {
        &self.star_exports
    }

    /// No requests, imports or exports.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
            && self.regular_imports.is_empty()
            && self.namespace_imports.is_empty()
            && self.local_exports.is_empty()
            && self.indirect_exports.is_empty()
            && self.star_exports.is_empty()
    }
}
