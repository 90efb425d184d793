//! Dependency declarations and classpath resolution
//!
//! A declaration binds one coordinate to one scope. The same coordinate may
//! be bound to several scopes (Lombok is typically `compile_only`,
//! `annotation_processor`, `test_compile_only` and
//! `test_annotation_processor` at once); each binding stands on its own.
//!
//! Scopes can extend other scopes: when `compile_only` extends
//! `annotation_processor`, everything declared for annotation processing is
//! also visible at compile time.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::coordinate::Coordinate;
use super::scope::{Classpath, Scope};

/// A (coordinate, scope) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DependencyDeclaration {
    pub coordinate: Coordinate,
    pub scope: Scope,
}

impl DependencyDeclaration {
    pub fn new(coordinate: Coordinate, scope: Scope) -> Self {
        Self { coordinate, scope }
    }
}

/// All dependency declarations of a project
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    /// Declarations in the order they were made
    declarations: Vec<DependencyDeclaration>,

    /// scope -> scopes it extends from
    extends: HashMap<Scope, Vec<Scope>>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a coordinate in a scope. Returns false if the exact pair was
    /// already declared.
    pub fn declare(&mut self, coordinate: Coordinate, scope: Scope) -> bool {
        let declaration = DependencyDeclaration::new(coordinate, scope);
        if self.declarations.contains(&declaration) {
            return false;
        }
        self.declarations.push(declaration);
        true
    }

    /// Removes one (coordinate, scope) binding, leaving other scopes alone
    pub fn remove(&mut self, coordinate: &Coordinate, scope: &Scope) -> bool {
        let len_before = self.declarations.len();
        self.declarations
            .retain(|d| !(&d.coordinate == coordinate && &d.scope == scope));
        self.declarations.len() != len_before
    }

    /// Makes `scope` inherit every declaration of `parent`
    pub fn extend(&mut self, scope: Scope, parent: Scope) {
        let parents = self.extends.entry(scope).or_default();
        if !parents.contains(&parent) {
            parents.push(parent);
        }
    }

    /// Returns the scopes `scope` directly extends
    pub fn parents(&self, scope: &Scope) -> &[Scope] {
        self.extends.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn declarations(&self) -> &[DependencyDeclaration] {
        &self.declarations
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Coordinates declared directly in a scope
    pub fn in_scope<'a>(&'a self, scope: &'a Scope) -> impl Iterator<Item = &'a Coordinate> {
        self.declarations
            .iter()
            .filter(move |d| &d.scope == scope)
            .map(|d| &d.coordinate)
    }

    /// Scopes a coordinate is bound to
    pub fn scopes_of(&self, coordinate: &Coordinate) -> Vec<&Scope> {
        self.declarations
            .iter()
            .filter(|d| &d.coordinate == coordinate)
            .map(|d| &d.scope)
            .collect()
    }

    /// The scope itself followed by everything it transitively extends.
    /// Extension cycles are tolerated; each scope appears once.
    pub fn effective_scopes(&self, scope: &Scope) -> Vec<Scope> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![scope.clone()];

        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            // Push in reverse so the first declared parent is visited first
            for parent in self.parents(&current).iter().rev() {
                stack.push(parent.clone());
            }
            order.push(current);
        }

        order
    }

    /// Resolves a classpath: declaration order, duplicates removed
    pub fn resolve(&self, classpath: &Classpath) -> Vec<Coordinate> {
        let mut scopes: Vec<Scope> = Vec::new();
        for member in classpath.members() {
            for scope in self.effective_scopes(&member) {
                if !scopes.contains(&scope) {
                    scopes.push(scope);
                }
            }
        }

        let mut seen = HashSet::new();
        self.declarations
            .iter()
            .filter(|d| scopes.contains(&d.scope))
            .filter(|d| seen.insert(d.coordinate.clone()))
            .map(|d| d.coordinate.clone())
            .collect()
    }

    /// Direct declarations grouped by scope
    pub fn by_scope(&self) -> BTreeMap<&Scope, Vec<&Coordinate>> {
        let mut grouped: BTreeMap<&Scope, Vec<&Coordinate>> = BTreeMap::new();
        for d in &self.declarations {
            grouped.entry(&d.scope).or_default().push(&d.coordinate);
        }
        grouped
    }
}
