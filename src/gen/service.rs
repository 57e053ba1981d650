//! Per-Service Document Generation
//!
//! Runs the three passes for one service: count every named type reachable
//! from its config loads, merge the fields of all loaded types into one
//! table, then assemble and print the document.

use std::collections::BTreeMap;
use tracing::{debug, info};

use super::fields::FieldTable;
use super::translate::Translator;
use super::usage::{UsageCounter, UsageTable};
use crate::config::GeneratorConfig;
use crate::cue::{format_file, CommentGroup, Field as CueField, File, ImportSpec, Label};
use crate::error::Result;
use crate::schema::{concrete_struct_type, instantiate, DeclRegistry, Service, Type};

/// Comment placed at the top of every generated file
pub const HEADER: &[&str] = &[
    "Code generated by encore. DO NOT EDIT.",
    "",
    "The contents of this file are generated from the structs used in",
    "conjunction with Encore's `config.Load[T]()` function. This file",
    "automatically be regenerated if the data types within the struct",
    "are changed.",
    "",
    "For more information about this file, see:",
    "https://encore.dev/docs/develop/config",
];

/// First line of [`HEADER`] as printed, used to recognize generated files
pub const HEADER_MARKER: &str = "// Code generated by encore. DO NOT EDIT.";

/// A rendered service document
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDocument {
    pub service: String,
    /// Printed CUE source
    pub contents: String,
    /// Number of hoisted `#Definition`s
    pub definitions: usize,
    /// Number of merged top-level fields
    pub fields: usize,
}

/// Generate the document for one service.
///
/// Returns `Ok(None)` when the service loads no configuration fields.
pub fn generate_service(
    registry: &DeclRegistry,
    service: &Service,
    config: &GeneratorConfig,
) -> Result<Option<GeneratedDocument>> {
    // ===== Pass 1: usage counting =====
    let mut counter = UsageCounter::new();
    for root in &service.config_loads {
        counter.count_root(registry, root)?;
    }
    let (usage, imports) = counter.finish(registry)?;

    // ===== Pass 2: field merging =====
    let translator = Translator::new(registry, &usage, config);
    let mut table = FieldTable::new();
    for root in &service.config_loads {
        let record = concrete_struct_type(registry, root, None)?;
        table.extend(translator.struct_fields(&record)?)?;
    }

    if table.is_empty() {
        debug!(service = %service.name, "no config fields, skipping");
        return Ok(None);
    }

    // ===== Pass 3: assembly =====
    let definitions = definitions(registry, &usage, &translator)?;
    let definition_count = definitions.len();
    let field_count = table.len();

    let mut decls = definitions;
    let mut fields = table.into_fields();
    // Definitions and top-level fields are separate sections
    if let Some(first) = fields.first_mut().filter(|_| definition_count > 0) {
        first.new_section = true;
    }
    decls.extend(fields);

    let file = File {
        header: Some(CommentGroup::new(HEADER.iter().map(|l| l.to_string()).collect())),
        package: service.name.clone(),
        imports: import_specs(&imports),
        decls,
    };
    let contents = format_file(&file, &config.indent);

    info!(
        service = %service.name,
        definitions = definition_count,
        fields = field_count,
        "generated config document"
    );

    Ok(Some(GeneratedDocument {
        service: service.name.clone(),
        contents,
        definitions: definition_count,
        fields: field_count,
    }))
}

/// Hoisted definitions in declaration order
fn definitions(registry: &DeclRegistry, usage: &UsageTable, translator: &Translator<'_>) -> Result<Vec<CueField>> {
    let mut out = Vec::new();
    for (key, entry) in usage.hoisted() {
        let Some(ident) = entry.ident.as_ref() else {
            continue;
        };
        let decl = registry.get(key.decl_id)?;
        let body: Type = instantiate(registry, &key.to_named())?;
        let mut field = CueField::new(Label::name(ident.clone()), translator.to_cue(&body)?);
        match CommentGroup::from_doc(&decl.doc) {
            Some(comments) => field.comments = Some(comments),
            None => field.new_section = true,
        }
        debug!(ident = %ident, count = entry.count, "hoisted definition");
        out.push(field);
    }
    Ok(out)
}

fn import_specs(imports: &BTreeMap<String, String>) -> Vec<ImportSpec> {
    imports
        .iter()
        .map(|(path, local)| ImportSpec::new(path.clone(), local))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CuegenError;
    use crate::schema::{Builtin, Decl, Field, Tag};

    fn registry() -> DeclRegistry {
        DeclRegistry::new(vec![
            Decl::new(1, "Retry", Type::record(vec![Field::new("Count", Type::builtin(Builtin::Int))])),
            Decl::new(
                2,
                "Config",
                Type::record(vec![
                    Field::new("Primary", Type::named(1)),
                    Field::new("Fallback", Type::named(1)),
                ]),
            ),
            Decl::new(
                3,
                "Timing",
                Type::record(vec![Field::new("Started", Type::builtin(Builtin::Time))
                    .with_tag(Tag::new("json", "started"))]),
            ),
            Decl::new(4, "Port", Type::builtin(Builtin::Int)),
        ])
        .unwrap()
    }

    fn generate(reg: &DeclRegistry, loads: Vec<Type>) -> Result<Option<GeneratedDocument>> {
        generate_service(reg, &Service::new("svc", loads), &GeneratorConfig::default())
    }

    fn body(doc: &GeneratedDocument) -> &str {
        let start = doc.contents.find("package ").unwrap();
        &doc.contents[start..]
    }

    #[test]
    fn test_header_is_verbatim() {
        let doc = generate(&registry(), vec![Type::named(3)]).unwrap().unwrap();
        assert!(doc.contents.starts_with(
            "// Code generated by encore. DO NOT EDIT.\n\
             //\n\
             // The contents of this file are generated from the structs used in\n\
             // conjunction with Encore's `config.Load[T]()` function. This file\n\
             // automatically be regenerated if the data types within the struct\n\
             // are changed.\n\
             //\n\
             // For more information about this file, see:\n\
             // https://encore.dev/docs/develop/config\n\
             \n\
             package svc\n"
        ));
        assert!(doc.contents.starts_with(HEADER_MARKER));
    }

    #[test]
    fn test_shared_type_is_hoisted() {
        let doc = generate(&registry(), vec![Type::named(2)]).unwrap().unwrap();
        assert_eq!(doc.definitions, 1);
        assert_eq!(
            body(&doc),
            "package svc\n\n#Retry: {\n\tCount: int\n}\n\nPrimary:  #Retry\nFallback: #Retry\n"
        );
    }

    #[test]
    fn test_time_import() {
        let doc = generate(&registry(), vec![Type::named(3)]).unwrap().unwrap();
        assert_eq!(body(&doc), "package svc\n\nimport \"time\"\n\nstarted: time.Time\n");
    }

    #[test]
    fn test_no_loads_no_document() {
        assert_eq!(generate(&registry(), vec![]).unwrap(), None);
    }

    #[test]
    fn test_empty_struct_no_document() {
        assert_eq!(generate(&registry(), vec![Type::record(vec![])]).unwrap(), None);
    }

    #[test]
    fn test_root_must_be_struct() {
        match generate(&registry(), vec![Type::named(4)]) {
            Err(CuegenError::NotAStruct { name }) => assert_eq!(name, "Port"),
            other => panic!("Expected NotAStruct, got {:?}", other),
        }
    }

    #[test]
    fn test_definition_doc_comment() {
        let reg = DeclRegistry::new(vec![
            Decl::new(1, "Retry", Type::builtin(Builtin::Int)).with_doc("Retry policy."),
        ])
        .unwrap();
        let root = Type::record(vec![
            Field::new("A", Type::named(1)),
            Field::new("B", Type::named(1)),
        ]);
        let doc = generate(&reg, vec![root]).unwrap().unwrap();
        assert_eq!(body(&doc), "package svc\n\n// Retry policy.\n#Retry: int\n\nA: #Retry\nB: #Retry\n");
    }

    #[test]
    fn test_alias_root_loaded_twice() {
        let reg = DeclRegistry::new(vec![
            Decl::new(
                1,
                "Base",
                Type::record(vec![
                    Field::new("Port", Type::builtin(Builtin::Int)),
                    Field::new("Name", Type::builtin(Builtin::String)),
                ]),
            ),
            Decl::new(2, "Config", Type::named(1)),
        ])
        .unwrap();
        let doc = generate(&reg, vec![Type::named(2), Type::named(2)]).unwrap().unwrap();
        assert_eq!(doc.definitions, 0);
        assert_eq!(doc.fields, 2);
        assert_eq!(body(&doc), "package svc\n\nPort: int\nName: string\n");
    }

    #[test]
    fn test_deterministic() {
        let reg = registry();
        let loads = vec![Type::named(2), Type::named(3)];
        let first = generate(&reg, loads.clone()).unwrap().unwrap();
        let second = generate(&reg, loads).unwrap().unwrap();
        assert_eq!(first.contents, second.contents);
    }
}
