//! Symbols and exports file loading.
//!
//! A loaded file is decomposed into its directive prologue, its plain code,
//! the bindings it draws from other files (symbol imports), the bindings it
//! draws from external modules (requirement imports) and the names it
//! exports. Symbol imports and symbols-file exports are registered with the
//! symbol table as they are found.

use jsld_codegen::RequirementBinding;
use jsld_js::{
    parse_module, top_level_items, validate, DeclaredName, ExportDecl, ImportBinding, ImportDecl,
    Statement, TopLevelItem,
};
use jsld_types::names::SYMBOLS_MODULE;
use jsld_types::{ErrorCode, LinkError, Result, Span};
use tracing::{debug, instrument};

use crate::requirement_table::RequirementTable;
use crate::symbol_table::{Definition, SymbolTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Internal implementations; exports go to the symbols container and
    /// the file is dropped when none of them is used.
    Symbols,
    /// The public API; exports go to the exports container.
    Exports,
}

impl FileKind {
    fn describe(self) -> &'static str {
        match self {
            Self::Symbols => "symbols file",
            Self::Exports => "exports file",
        }
    }
}

/// `import { symbol as local } from '__symbols'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolImport {
    pub symbol: String,
    pub local: String,
}

/// An import from an external module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementImport {
    pub specifier: String,
    /// `None` for a side-effect-only import.
    pub binding: Option<RequirementBinding>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBinding {
    pub local: String,
    pub exported: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsModule {
    pub path: String,
    pub kind: FileKind,
    pub directives: Vec<Statement>,
    pub code: Vec<Statement>,
    pub symbol_imports: Vec<SymbolImport>,
    pub requirement_imports: Vec<RequirementImport>,
    pub exports: Vec<ExportBinding>,
}

impl JsModule {
    fn new(path: &str, kind: FileKind) -> Self {
        Self {
            path: path.to_string(),
            kind,
            directives: Vec::new(),
            code: Vec::new(),
            symbol_imports: Vec::new(),
            requirement_imports: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Exported names, in declaration order.
    pub fn exported_names(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|e| e.exported.as_str())
    }
}

pub fn load_symbols_file(
    path: &str,
    source: &str,
    symbols: &mut SymbolTable,
    requirements: &mut RequirementTable,
) -> Result<JsModule> {
    load(FileKind::Symbols, path, source, symbols, requirements)
}

pub fn load_exports_file(
    path: &str,
    source: &str,
    symbols: &mut SymbolTable,
    requirements: &mut RequirementTable,
) -> Result<JsModule> {
    load(FileKind::Exports, path, source, symbols, requirements)
}

/// Parse, validate and decompose one file, registering what it imports
/// and (for symbols files) what it defines.
#[instrument(level = "debug", skip(source, symbols, requirements))]
pub fn load(
    kind: FileKind,
    path: &str,
    source: &str,
    symbols: &mut SymbolTable,
    requirements: &mut RequirementTable,
) -> Result<JsModule> {
    let parsed = parse_module(path, source)?;
    let errors = validate(&parsed);
    if let Some(err) = combine(path, errors) {
        return Err(err);
    }

    let mut loader = Loader {
        module: JsModule::new(path, kind),
        requirements,
        reexports: 0,
    };
    for item in top_level_items(&parsed)? {
        loader.item(item)?;
    }
    let module = loader.module;

    for import in &module.symbol_imports {
        let id = symbols.add_undefined(&import.symbol);
        symbols.mark_used(id);
    }
    if kind == FileKind::Symbols {
        for name in module.exported_names() {
            symbols.add_defined(name, Definition::Js { file: path.to_string() })?;
        }
    }

    debug!(
        code = module.code.len(),
        symbol_imports = module.symbol_imports.len(),
        requirement_imports = module.requirement_imports.len(),
        exports = module.exports.len(),
        "loaded {}",
        kind.describe()
    );
    Ok(module)
}

/// Fold early errors into one, keeping every message.
fn combine(path: &str, mut errors: Vec<LinkError>) -> Option<LinkError> {
    match errors.len() {
        0 => None,
        1 => errors.pop(),
        n => {
            let span = errors[0].span;
            let items: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            let mut err = LinkError::new(
                ErrorCode::JS_INVALID,
                format!("{n} errors in '{path}'"),
            )
            .in_file(path)
            .with_items(items);
            err.span = span;
            Some(err)
        }
    }
}

struct Loader<'a> {
    module: JsModule,
    requirements: &'a mut RequirementTable,
    reexports: usize,
}

impl Loader<'_> {
    fn error(&self, code: ErrorCode, span: Span, message: String) -> LinkError {
        LinkError::new(code, message)
            .in_file(self.module.path.clone())
            .at(span)
    }

    fn item(&mut self, item: TopLevelItem) -> Result<()> {
        match item {
            TopLevelItem::Directive(statement) => self.module.directives.push(statement),
            TopLevelItem::Statement(statement) => self.module.code.push(statement),
            TopLevelItem::Import(import) => self.import(import)?,
            TopLevelItem::Export(export) => self.export(export)?,
        }
        Ok(())
    }

    fn import(&mut self, import: ImportDecl) -> Result<()> {
        let path = self.module.path.clone();
        if import
            .bindings
            .iter()
            .any(|b| matches!(b, ImportBinding::Namespace { .. }))
        {
            return Err(self.error(
                ErrorCode::NAMESPACE_IMPORT,
                import.span,
                format!("'{path}' cannot contain namespace imports (import * as ...)"),
            ));
        }

        if import.specifier == SYMBOLS_MODULE {
            if import.bindings.is_empty() {
                return Err(self.error(
                    ErrorCode::IMPORT_ALL,
                    import.span,
                    format!("'{path}' cannot import '{SYMBOLS_MODULE}' without naming symbols"),
                ));
            }
            for binding in import.bindings {
                match binding {
                    ImportBinding::Named { imported, local } => {
                        self.module.symbol_imports.push(SymbolImport {
                            symbol: imported,
                            local,
                        });
                    }
                    _ => {
                        return Err(self.error(
                            ErrorCode::DEFAULT_IMPORT,
                            import.span,
                            format!("'{path}' cannot contain a default import from '{SYMBOLS_MODULE}'"),
                        ));
                    }
                }
            }
            return Ok(());
        }

        self.requirements.add(&import.specifier);
        if import.bindings.is_empty() {
            self.module.requirement_imports.push(RequirementImport {
                specifier: import.specifier,
                binding: None,
            });
            return Ok(());
        }
        for binding in import.bindings {
            let binding = match binding {
                ImportBinding::Default { local } => RequirementBinding::Whole { local },
                ImportBinding::Named { imported, local } => RequirementBinding::Property {
                    name: imported,
                    local,
                },
                ImportBinding::Namespace { .. } => continue,
            };
            self.module.requirement_imports.push(RequirementImport {
                specifier: import.specifier.clone(),
                binding: Some(binding),
            });
        }
        Ok(())
    }

    fn export(&mut self, export: ExportDecl) -> Result<()> {
        let path = self.module.path.clone();
        match export {
            ExportDecl::Default { span } => Err(self.error(
                ErrorCode::EXPORT_DEFAULT,
                span,
                format!("'{path}' cannot contain export default"),
            )),
            ExportDecl::All { span, .. } => Err(self.error(
                ErrorCode::EXPORT_ALL,
                span,
                format!("'{path}' cannot contain export * declarations"),
            )),
            ExportDecl::Clause {
                specs,
                source: None,
                ..
            } => {
                self.module
                    .exports
                    .extend(specs.into_iter().map(|spec| ExportBinding {
                        local: spec.local,
                        exported: spec.exported,
                    }));
                Ok(())
            }
            ExportDecl::Clause {
                specs,
                source: Some(source),
                span,
            } => {
                if self.module.kind == FileKind::Symbols {
                    return Err(self.error(
                        ErrorCode::EXPORT_FROM,
                        span,
                        format!("'{path}' cannot contain export ... from declarations"),
                    ));
                }
                for spec in specs {
                    let local = self.reexport_local();
                    if source == SYMBOLS_MODULE {
                        self.module.symbol_imports.push(SymbolImport {
                            symbol: spec.local,
                            local: local.clone(),
                        });
                    } else {
                        self.requirements.add(&source);
                        self.module.requirement_imports.push(RequirementImport {
                            specifier: source.clone(),
                            binding: Some(RequirementBinding::Property {
                                name: spec.local,
                                local: local.clone(),
                            }),
                        });
                    }
                    self.module.exports.push(ExportBinding {
                        local,
                        exported: spec.exported,
                    });
                }
                Ok(())
            }
            ExportDecl::Declaration { names, statement } => {
                for name in names {
                    match name {
                        DeclaredName::Identifier(name) => self.module.exports.push(ExportBinding {
                            local: name.clone(),
                            exported: name,
                        }),
                        DeclaredName::Pattern(span) => {
                            return Err(self.error(
                                ErrorCode::DESTRUCTURING_EXPORT,
                                span,
                                format!("'{path}' cannot export destructuring declarations"),
                            ));
                        }
                    }
                }
                self.module.code.push(statement);
                Ok(())
            }
        }
    }

    /// Hidden local holding a re-exported value.
    fn reexport_local(&mut self) -> String {
        let local = format!("__reexport_{}", self.reexports);
        self.reexports += 1;
        local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_one(kind: FileKind, source: &str) -> Result<(JsModule, SymbolTable, RequirementTable)> {
        let mut symbols = SymbolTable::new();
        let mut requirements = RequirementTable::new();
        let module = load(kind, "file.js", source, &mut symbols, &mut requirements)?;
        Ok((module, symbols, requirements))
    }

    fn code(source: &str) -> ErrorCode {
        load_one(FileKind::Symbols, source).unwrap_err().code
    }

    #[test]
    fn symbols_file_decomposition() {
        let (module, symbols, requirements) = load_one(
            FileKind::Symbols,
            "'use strict';\n\
             import { puts as print } from '__symbols';\n\
             import $, { isArray } from 'jquery';\n\
             import 'polyfill';\n\
             const table = [];\n\
             export function log(x) { print(x); }\n\
             export { table as logTable };\n",
        )
        .unwrap();

        assert_eq!(module.directives.len(), 1);
        assert_eq!(
            module.symbol_imports,
            vec![SymbolImport {
                symbol: "puts".into(),
                local: "print".into()
            }]
        );
        assert_eq!(module.requirement_imports.len(), 3);
        assert_eq!(
            module.requirement_imports[0].binding,
            Some(RequirementBinding::Whole { local: "$".into() })
        );
        assert_eq!(module.requirement_imports[2].binding, None);
        let texts: Vec<_> = module.code.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["const table = [];", "function log(x) { print(x); }"]);
        assert_eq!(module.exported_names().collect::<Vec<_>>(), vec!["log", "logTable"]);

        assert!(symbols.is_used("puts"));
        assert!(!symbols.get("puts").unwrap().is_defined());
        assert!(symbols.get("log").unwrap().is_defined());
        assert!(!symbols.is_used("log"));
        let specifiers: Vec<_> = requirements.iter().map(|r| r.specifier.as_str()).collect();
        assert_eq!(specifiers, vec!["jquery", "polyfill"]);
    }

    #[test]
    fn exports_file_defines_nothing() {
        let (module, symbols, _) = load_one(
            FileKind::Exports,
            "import { add } from '__symbols';\nexport function sum(a, b) { return add(a, b); }\n",
        )
        .unwrap();
        assert_eq!(module.exported_names().collect::<Vec<_>>(), vec!["sum"]);
        assert!(symbols.get("sum").is_none());
        assert!(symbols.is_used("add"));
    }

    #[test]
    fn exports_file_reexports() {
        let (module, symbols, requirements) = load_one(
            FileKind::Exports,
            "export { add as plus } from '__symbols';\nexport { map } from 'lodash';\n",
        )
        .unwrap();
        assert_eq!(
            module.symbol_imports,
            vec![SymbolImport {
                symbol: "add".into(),
                local: "__reexport_0".into()
            }]
        );
        assert_eq!(
            module.requirement_imports[0].binding,
            Some(RequirementBinding::Property {
                name: "map".into(),
                local: "__reexport_1".into()
            })
        );
        assert_eq!(
            module.exports,
            vec![
                ExportBinding {
                    local: "__reexport_0".into(),
                    exported: "plus".into()
                },
                ExportBinding {
                    local: "__reexport_1".into(),
                    exported: "map".into()
                },
            ]
        );
        assert!(symbols.is_used("add"));
        assert_eq!(requirements.get("lodash").unwrap().ident, "__lodash");
    }

    #[test]
    fn rejected_shapes() {
        assert_eq!(code("import * as ns from 'x';"), ErrorCode::NAMESPACE_IMPORT);
        assert_eq!(code("import '__symbols';"), ErrorCode::IMPORT_ALL);
        assert_eq!(code("import s from '__symbols';"), ErrorCode::DEFAULT_IMPORT);
        assert_eq!(code("export default 1;"), ErrorCode::EXPORT_DEFAULT);
        assert_eq!(code("export * from 'x';"), ErrorCode::EXPORT_ALL);
        assert_eq!(code("export { a } from '__symbols';"), ErrorCode::EXPORT_FROM);
        assert_eq!(code("export const { a } = o;"), ErrorCode::DESTRUCTURING_EXPORT);
        assert_eq!(code("let a;\nlet a;"), ErrorCode::JS_INVALID);
        assert_eq!(code("function ("), ErrorCode::JS_PARSE);
    }

    #[test]
    fn errors_name_the_file() {
        let err = load_one(FileKind::Exports, "export default function() {}\n").unwrap_err();
        assert_eq!(err.file.as_deref(), Some("file.js"));
        assert!(err.message.contains("cannot contain export default"));
        assert!(err.message.contains("file.js"));
    }

    #[test]
    fn several_early_errors_are_combined() {
        let err = load_one(FileKind::Symbols, "let a;\nlet a;\nconst b = 1;\nconst b = 2;\n")
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::JS_INVALID);
        assert_eq!(err.items.len(), 2);
    }
}
