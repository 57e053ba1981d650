//! Named Type Usage Counting
//!
//! Counts how often each named type is referenced across all config loads of
//! one service and collects the imports the builtins require. Named types
//! referenced more than once are hoisted into a `#Definition`; the rest are
//! inlined at their single use site.
//!
//! Definition identifiers are derived from the declarations themselves
//! (name, type arguments, package on collision), never from traversal order,
//! so regenerating unchanged input is byte-identical.

use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::error::Result;
use crate::schema::{instantiate, walk, Builtin, DeclId, DeclRegistry, Named, Node, Type};

// =============================================================================
// Usage Key
// =============================================================================

/// Identity of a named type: the declaration plus its concrete type arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UsageKey {
    pub decl_id: DeclId,
    pub type_arguments: Vec<Type>,
}

impl UsageKey {
    pub fn to_named(&self) -> Named {
        Named::with_args(self.decl_id, self.type_arguments.clone())
    }
}

impl From<&Named> for UsageKey {
    fn from(named: &Named) -> Self {
        Self {
            decl_id: named.id,
            type_arguments: named.type_arguments.clone(),
        }
    }
}

/// Count and (for hoisted types) the assigned definition identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    pub count: u32,
    pub ident: Option<String>,
}

// =============================================================================
// Usage Counter
// =============================================================================

/// Accumulator for the counting pass
#[derive(Debug, Default)]
pub struct UsageCounter {
    counts: HashMap<UsageKey, u32>,
    /// import path -> local name
    imports: BTreeMap<String, String>,
}

impl UsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count everything reachable from a config load.
    ///
    /// The loaded type itself is not a use site: its fields are spread into
    /// the top level of the document, so only references inside it count.
    /// Aliases on the way to the loaded struct are not use sites either.
    pub fn count_root(&mut self, registry: &DeclRegistry, root: &Type) -> Result<()> {
        let mut current = root.clone();
        while let Type::Named(named) = &current {
            self.counts.entry(UsageKey::from(named)).or_insert(0);
            let body = instantiate(registry, named)?;
            current = body;
        }
        self.count_type(registry, &current)
    }

    /// Count every reference under `typ`
    pub fn count_type(&mut self, registry: &DeclRegistry, typ: &Type) -> Result<()> {
        walk(registry, typ, &mut |node| {
            self.visit(node);
            Ok(())
        })
    }

    fn visit(&mut self, node: Node<'_>) {
        match node {
            Node::Named(named) => {
                *self.counts.entry(UsageKey::from(named)).or_insert(0) += 1;
            }
            Node::Builtin(Builtin::Time) => {
                self.imports.insert("time".to_string(), "time".to_string());
            }
            _ => {}
        }
    }

    /// Freeze the counts and assign definition identifiers
    pub fn finish(self, registry: &DeclRegistry) -> Result<(UsageTable, BTreeMap<String, String>)> {
        let mut keys: Vec<(usize, String, UsageKey)> = self
            .counts
            .keys()
            .map(|key| {
                let pos = registry.position(key.decl_id).unwrap_or(usize::MAX);
                let args: Vec<String> = key.type_arguments.iter().map(|a| a.to_string()).collect();
                (pos, args.join(","), key.clone())
            })
            .collect();
        keys.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));

        let hoisted: Vec<&UsageKey> = keys
            .iter()
            .map(|(_, _, key)| key)
            .filter(|key| self.counts[*key] > 1)
            .collect();
        let mut idents = assign_idents(registry, &hoisted)?;

        let mut entries = IndexMap::with_capacity(keys.len());
        for (_, _, key) in keys {
            let count = self.counts[&key];
            let ident = idents.remove(&key);
            debug!(decl = key.decl_id, count, ident = ?ident, "named type usage");
            entries.insert(key, Usage { count, ident });
        }

        Ok((UsageTable { entries }, self.imports))
    }
}

// =============================================================================
// Usage Table
// =============================================================================

/// Frozen usage counts for one service, in declaration order
#[derive(Debug, Clone, Default)]
pub struct UsageTable {
    entries: IndexMap<UsageKey, Usage>,
}

impl UsageTable {
    /// Number of references; 0 for unknown types
    pub fn count(&self, named: &Named) -> u32 {
        self.entries
            .get(&UsageKey::from(named))
            .map(|u| u.count)
            .unwrap_or(0)
    }

    /// Definition identifier, set only for hoisted types
    pub fn ident(&self, named: &Named) -> Option<&str> {
        self.entries
            .get(&UsageKey::from(named))
            .and_then(|u| u.ident.as_deref())
    }

    /// Types referenced more than once, in declaration order
    pub fn hoisted(&self) -> impl Iterator<Item = (&UsageKey, &Usage)> {
        self.entries.iter().filter(|(_, u)| u.count > 1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Definition Naming
// =============================================================================

/// Assign `#Name` identifiers, disambiguating collisions with the package
/// name and then a numeric suffix. `keys` must already be sorted.
fn assign_idents(registry: &DeclRegistry, keys: &[&UsageKey]) -> Result<HashMap<UsageKey, String>> {
    let mut base_names = Vec::with_capacity(keys.len());
    let mut base_count: HashMap<String, usize> = HashMap::new();
    for key in keys {
        let base = base_name(registry, key)?;
        *base_count.entry(base.clone()).or_insert(0) += 1;
        base_names.push(base);
    }

    let mut used: HashSet<String> = HashSet::new();
    let mut idents = HashMap::with_capacity(keys.len());
    for (key, base) in keys.iter().zip(base_names) {
        let mut name = base.clone();
        if base_count[&base] > 1 {
            let pkg = &registry.get(key.decl_id)?.loc.pkg_name;
            if !pkg.is_empty() {
                name = format!("{}_{}", sanitize(pkg), base);
            }
        }
        let mut candidate = name.clone();
        let mut suffix = 2;
        while used.contains(&candidate) {
            candidate = format!("{}_{}", name, suffix);
            suffix += 1;
        }
        used.insert(candidate.clone());
        idents.insert((*key).clone(), format!("#{}", candidate));
    }
    Ok(idents)
}

/// `Name` or `Name_arg1_arg2` for generic instantiations
fn base_name(registry: &DeclRegistry, key: &UsageKey) -> Result<String> {
    let decl = registry.get(key.decl_id)?;
    let mut name = sanitize(&decl.name);
    for arg in &key.type_arguments {
        name.push('_');
        name.push_str(&type_arg_name(registry, arg)?);
    }
    Ok(name)
}

fn type_arg_name(registry: &DeclRegistry, typ: &Type) -> Result<String> {
    Ok(match typ {
        Type::Named(named) => base_name(registry, &UsageKey::from(named))?,
        Type::Builtin(b) => b.as_str().to_string(),
        Type::List(l) => format!("List{}", type_arg_name(registry, &l.elem)?),
        Type::Map(m) => format!(
            "Map{}{}",
            type_arg_name(registry, &m.key)?,
            type_arg_name(registry, &m.value)?
        ),
        Type::Config(c) => type_arg_name(registry, &c.elem)?,
        Type::Struct(_) => "Struct".to_string(),
        Type::TypeParameter(p) => format!("T{}", p.param_idx),
    })
}

/// Keep only characters valid inside an identifier
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Decl, Field};

    fn int() -> Type {
        Type::builtin(Builtin::Int)
    }

    fn registry() -> DeclRegistry {
        DeclRegistry::new(vec![
            Decl::new(1, "Retry", Type::record(vec![Field::new("Count", int())])).in_package("app/a", "a"),
            Decl::new(
                2,
                "Config",
                Type::record(vec![
                    Field::new("Primary", Type::named(1)),
                    Field::new("Secondary", Type::named(1)),
                    Field::new("Started", Type::builtin(Builtin::Time)),
                    Field::new("Once", Type::named(3)),
                ]),
            ),
            Decl::new(3, "Single", int()),
            Decl::new(4, "Retry", Type::builtin(Builtin::String)).in_package("app/b", "b"),
            Decl::new(
                5,
                "Box",
                Type::record(vec![Field::new("Value", Type::type_param(5, 0))]),
            )
            .with_type_params(&["T"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_counts_and_imports() {
        let reg = registry();
        let mut counter = UsageCounter::new();
        counter.count_root(&reg, &Type::named(2)).unwrap();
        let (table, imports) = counter.finish(&reg).unwrap();

        assert_eq!(table.count(&Named::new(1)), 2);
        assert_eq!(table.count(&Named::new(3)), 1);
        // The loaded type itself is tracked but not counted
        assert_eq!(table.count(&Named::new(2)), 0);
        assert_eq!(table.len(), 3);

        assert_eq!(table.ident(&Named::new(1)), Some("#Retry"));
        assert_eq!(table.ident(&Named::new(3)), None);
        assert_eq!(imports.get("time").map(String::as_str), Some("time"));
    }

    #[test]
    fn test_alias_root_is_not_a_use_site() {
        let reg = DeclRegistry::new(vec![
            Decl::new(1, "Base", Type::record(vec![Field::new("Port", int())])),
            Decl::new(2, "Config", Type::named(1)),
            Decl::new(3, "Settings", Type::named(2)),
        ])
        .unwrap();
        let mut counter = UsageCounter::new();
        counter.count_root(&reg, &Type::named(3)).unwrap();
        counter.count_root(&reg, &Type::named(3)).unwrap();
        let (table, _) = counter.finish(&reg).unwrap();

        assert_eq!(table.count(&Named::new(1)), 0);
        assert_eq!(table.count(&Named::new(2)), 0);
        assert_eq!(table.count(&Named::new(3)), 0);
        assert_eq!(table.hoisted().count(), 0);
    }

    #[test]
    fn test_counting_is_global_across_loads() {
        let reg = registry();
        let mut counter = UsageCounter::new();
        counter
            .count_root(&reg, &Type::record(vec![Field::new("R", Type::named(3))]))
            .unwrap();
        counter
            .count_root(&reg, &Type::record(vec![Field::new("R", Type::named(3))]))
            .unwrap();
        let (table, imports) = counter.finish(&reg).unwrap();
        assert_eq!(table.count(&Named::new(3)), 2);
        assert_eq!(table.hoisted().count(), 1);
        assert!(imports.is_empty());
    }

    #[test]
    fn test_nested_references_counted_per_occurrence() {
        let reg = DeclRegistry::new(vec![
            Decl::new(1, "Leaf", int()),
            Decl::new(2, "Mid", Type::record(vec![Field::new("L", Type::named(1))])),
        ])
        .unwrap();
        let mut counter = UsageCounter::new();
        counter
            .count_root(
                &reg,
                &Type::record(vec![Field::new("A", Type::named(2)), Field::new("B", Type::named(2))]),
            )
            .unwrap();
        let (table, _) = counter.finish(&reg).unwrap();
        assert_eq!(table.count(&Named::new(2)), 2);
        assert_eq!(table.count(&Named::new(1)), 2);
    }

    #[test]
    fn test_collisions_use_package_name() {
        let reg = registry();
        let mut counter = UsageCounter::new();
        let root = Type::record(vec![
            Field::new("A", Type::named(1)),
            Field::new("B", Type::named(1)),
            Field::new("C", Type::named(4)),
            Field::new("D", Type::named(4)),
        ]);
        counter.count_root(&reg, &root).unwrap();
        let (table, _) = counter.finish(&reg).unwrap();
        assert_eq!(table.ident(&Named::new(1)), Some("#a_Retry"));
        assert_eq!(table.ident(&Named::new(4)), Some("#b_Retry"));
    }

    #[test]
    fn test_generic_instantiations_are_distinct() {
        let reg = registry();
        let box_int = Type::Named(Named::with_args(5, vec![int()]));
        let box_retry = Type::Named(Named::with_args(5, vec![Type::named(1)]));
        let root = Type::record(vec![
            Field::new("A", box_int.clone()),
            Field::new("B", box_int),
            Field::new("C", box_retry.clone()),
            Field::new("D", box_retry),
        ]);
        let mut counter = UsageCounter::new();
        counter.count_root(&reg, &root).unwrap();
        let (table, _) = counter.finish(&reg).unwrap();

        assert_eq!(table.ident(&Named::with_args(5, vec![int()])), Some("#Box_int"));
        assert_eq!(
            table.ident(&Named::with_args(5, vec![Type::named(1)])),
            Some("#Box_Retry")
        );
        // Retry is reached through both Box[Retry] bodies
        assert_eq!(table.count(&Named::new(1)), 2);
    }

    #[test]
    fn test_hoisted_in_declaration_order() {
        let reg = registry();
        let root = Type::record(vec![
            Field::new("A", Type::named(3)),
            Field::new("B", Type::named(1)),
            Field::new("C", Type::named(3)),
            Field::new("D", Type::named(1)),
        ]);
        let mut counter = UsageCounter::new();
        counter.count_root(&reg, &root).unwrap();
        let (table, _) = counter.finish(&reg).unwrap();
        let order: Vec<DeclId> = table.hoisted().map(|(k, _)| k.decl_id).collect();
        assert_eq!(order, vec![1, 3]);
    }
}
