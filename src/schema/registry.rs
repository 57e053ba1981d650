//! Declaration Registry
//!
//! Id-indexed view over the front end's declarations. Construction builds a
//! petgraph dependency graph of declarations and rejects reference cycles:
//! the usage walk and inline translation both recurse through declaration
//! bodies and rely on the graph being acyclic.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::{Decl, DeclId, Type};
use crate::error::{CuegenError, Result};

/// Read-only declaration lookup shared by every service's generation
#[derive(Debug, Clone)]
pub struct DeclRegistry {
    /// Declarations in front-end order
    decls: Vec<Decl>,
    /// id -> position in `decls`
    index: HashMap<DeclId, usize>,
}

impl DeclRegistry {
    /// Build a registry, validating ids and acyclicity
    pub fn new(decls: Vec<Decl>) -> Result<Self> {
        let mut index = HashMap::with_capacity(decls.len());
        for (pos, decl) in decls.iter().enumerate() {
            if index.insert(decl.id, pos).is_some() {
                return Err(CuegenError::DuplicateDecl(decl.id));
            }
        }

        let registry = Self { decls, index };
        registry.check_acyclic()?;
        Ok(registry)
    }

    /// Look up a declaration, failing for unknown ids
    pub fn get(&self, id: DeclId) -> Result<&Decl> {
        self.index
            .get(&id)
            .map(|&pos| &self.decls[pos])
            .ok_or(CuegenError::UnresolvedDecl { id })
    }

    /// Position of a declaration in front-end order
    pub fn position(&self, id: DeclId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    fn check_acyclic(&self) -> Result<()> {
        let mut graph: DiGraph<DeclId, ()> = DiGraph::with_capacity(self.decls.len(), self.decls.len() * 2);
        let nodes: HashMap<DeclId, NodeIndex> = self
            .decls
            .iter()
            .map(|d| (d.id, graph.add_node(d.id)))
            .collect();

        for decl in &self.decls {
            let mut refs = Vec::new();
            collect_refs(&decl.typ, &mut refs);
            for target in refs {
                // Unknown targets surface as resolution errors during generation
                if let Some(&to) = nodes.get(&target) {
                    graph.update_edge(nodes[&decl.id], to, ());
                }
            }
        }

        for scc in kosaraju_scc(&graph) {
            let self_loop = scc.len() == 1 && graph.contains_edge(scc[0], scc[0]);
            if scc.len() > 1 || self_loop {
                let mut members: Vec<String> = scc
                    .iter()
                    .filter_map(|idx| self.get(graph[*idx]).ok())
                    .map(|d| d.name.clone())
                    .collect();
                members.sort();
                return Err(CuegenError::Cycle { members });
            }
        }

        Ok(())
    }
}

/// Collect every declaration id referenced from a type
fn collect_refs(typ: &Type, out: &mut Vec<DeclId>) {
    match typ {
        Type::Named(named) => {
            out.push(named.id);
            for arg in &named.type_arguments {
                collect_refs(arg, out);
            }
        }
        Type::Struct(s) => {
            for field in &s.fields {
                collect_refs(&field.typ, out);
            }
        }
        Type::Map(m) => {
            collect_refs(&m.key, out);
            collect_refs(&m.value, out);
        }
        Type::List(l) => collect_refs(&l.elem, out),
        Type::Config(c) => collect_refs(&c.elem, out),
        Type::Builtin(_) | Type::TypeParameter(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Builtin, Field};

    fn record(fields: Vec<(&str, Type)>) -> Type {
        Type::record(fields.into_iter().map(|(n, t)| Field::new(n, t)).collect())
    }

    #[test]
    fn test_lookup() {
        let registry = DeclRegistry::new(vec![
            Decl::new(7, "Retry", record(vec![("Count", Type::builtin(Builtin::Int))])),
        ])
        .unwrap();

        assert_eq!(registry.get(7).unwrap().name, "Retry");
        assert_eq!(registry.position(7), Some(0));
        assert!(matches!(registry.get(8), Err(CuegenError::UnresolvedDecl { id: 8 })));
    }

    #[test]
    fn test_duplicate_id() {
        let result = DeclRegistry::new(vec![
            Decl::new(1, "A", Type::builtin(Builtin::Int)),
            Decl::new(1, "B", Type::builtin(Builtin::Int)),
        ]);
        assert!(matches!(result, Err(CuegenError::DuplicateDecl(1))));
    }

    #[test]
    fn test_cycle_rejected() {
        let result = DeclRegistry::new(vec![
            Decl::new(1, "A", record(vec![("B", Type::named(2))])),
            Decl::new(2, "B", record(vec![("A", Type::list(Type::named(1)))])),
        ]);
        match result {
            Err(CuegenError::Cycle { members }) => assert_eq!(members, vec!["A", "B"]),
            other => panic!("Expected Cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_reference_rejected() {
        let result = DeclRegistry::new(vec![Decl::new(
            1,
            "Node",
            record(vec![("Children", Type::list(Type::named(1)))]),
        )]);
        assert!(matches!(result, Err(CuegenError::Cycle { .. })));
    }

    #[test]
    fn test_diamond_is_fine() {
        let registry = DeclRegistry::new(vec![
            Decl::new(1, "Top", record(vec![("L", Type::named(2)), ("R", Type::named(3))])),
            Decl::new(2, "Left", record(vec![("S", Type::named(4))])),
            Decl::new(3, "Right", record(vec![("S", Type::named(4))])),
            Decl::new(4, "Shared", Type::builtin(Builtin::String)),
        ]);
        assert!(registry.is_ok());
    }
}
