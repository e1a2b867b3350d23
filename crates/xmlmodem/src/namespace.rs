//! Prefix and default-namespace bookkeeping.
//!
//! Active `xmlns` prefixes live in parallel sorted vectors so lookup is a
//! binary search. Each binding records the depth it was declared at; when a
//! scope exits, bindings declared at the popped depth are pruned and any
//! bindings they shadowed are restored. The shadow storage is allocated
//! lazily — redeclaring a prefix at a deeper scope is legal but rare.

/// A resolved namespace: the `alias` in `alias:name` and the uri its
/// declaration bound it to.
///
/// Used as a caller-owned output slot: reader operations fill it in place so
/// no allocation happens on calls whose caller does not care about
/// namespaces. An unprefixed name leaves `alias` empty and carries the
/// default namespace uri, when one is in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Namespace {
    pub alias: Option<String>,
    pub uri: Option<String>,
}

impl Namespace {
    #[must_use]
    pub fn new(alias: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            uri: Some(uri.into()),
        }
    }

    /// A default (unprefixed) namespace declaration.
    #[must_use]
    pub fn default_uri(uri: impl Into<String>) -> Self {
        Self {
            alias: None,
            uri: Some(uri.into()),
        }
    }

    pub fn clear(&mut self) {
        self.alias = None;
        self.uri = None;
    }
}

/// Depth-scoped prefix bindings plus the per-depth default namespace.
///
/// Depth 1 is the document scope; every open element adds one depth.
#[derive(Debug)]
pub(crate) struct NamespaceStack {
    /// Sorted prefixes; `uris` and `depths` are index-parallel.
    prefixes: Vec<String>,
    uris: Vec<String>,
    depths: Vec<usize>,
    /// Default namespace per depth; index is depth - 1. Children inherit the
    /// parent's slot until overridden.
    defaults: Vec<Option<String>>,
    /// Shadowed bindings per depth, `(prefix, uri, declaring depth)`;
    /// allocated on first shadowing only.
    shadowed: Option<Vec<Vec<(String, String, usize)>>>,
}

impl NamespaceStack {
    pub fn new() -> Self {
        Self {
            prefixes: Vec::new(),
            uris: Vec::new(),
            depths: Vec::new(),
            defaults: vec![None],
            shadowed: None,
        }
    }

    /// Current nesting depth; always at least 1.
    pub fn depth(&self) -> usize {
        self.defaults.len()
    }

    /// Enters a new element scope, inheriting the default namespace.
    pub fn push_scope(&mut self) {
        let inherited = self.defaults.last().cloned().unwrap_or(None);
        self.defaults.push(inherited);
    }

    /// Leaves the current element scope: prunes bindings declared here and
    /// restores any bindings they shadowed.
    pub fn pop_scope(&mut self) {
        let depth = self.defaults.len();
        if depth <= 1 {
            return;
        }

        let mut i = 0;
        while i < self.prefixes.len() {
            if self.depths[i] >= depth {
                self.prefixes.remove(i);
                self.uris.remove(i);
                self.depths.remove(i);
            } else {
                i += 1;
            }
        }

        let mut restores = Vec::new();
        if let Some(shadowed) = &mut self.shadowed {
            if shadowed.len() >= depth {
                restores = shadowed[depth - 1].drain(..).collect();
                shadowed.truncate(depth - 1);
            }
        }
        for (prefix, uri, declared_at) in restores {
            self.reinsert(prefix, uri, declared_at);
        }

        self.defaults.pop();
    }

    /// Binds `prefix` to `uri` at the current depth, remembering a shallower
    /// binding of the same prefix so it can be restored on scope exit.
    pub fn insert(&mut self, prefix: &str, uri: String) {
        let depth = self.defaults.len();
        match self.prefixes.binary_search_by(|p| p.as_str().cmp(prefix)) {
            Ok(i) => {
                // A same-depth redeclaration needs no shadow entry; both
                // bindings die together when the scope exits.
                if self.depths[i] < depth {
                    let old_uri = self.uris[i].clone();
                    let old_depth = self.depths[i];
                    let shadowed = self.shadowed.get_or_insert_with(Vec::new);
                    if shadowed.len() < depth {
                        shadowed.resize_with(depth, Vec::new);
                    }
                    shadowed[depth - 1].push((prefix.to_string(), old_uri, old_depth));
                }
                self.uris[i] = uri;
                self.depths[i] = depth;
            }
            Err(i) => {
                self.prefixes.insert(i, prefix.to_string());
                self.uris.insert(i, uri);
                self.depths.insert(i, depth);
            }
        }
    }

    fn reinsert(&mut self, prefix: String, uri: String, declared_at: usize) {
        match self.prefixes.binary_search(&prefix) {
            Ok(i) => {
                self.uris[i] = uri;
                self.depths[i] = declared_at;
            }
            Err(i) => {
                self.prefixes.insert(i, prefix);
                self.uris.insert(i, uri);
                self.depths.insert(i, declared_at);
            }
        }
    }

    /// Resolves a prefix against the active bindings; nearest enclosing
    /// declaration wins.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        self.prefixes
            .binary_search_by(|p| p.as_str().cmp(prefix))
            .ok()
            .map(|i| self.uris[i].as_str())
    }

    /// The default namespace uri in scope, if any.
    pub fn default_uri(&self) -> Option<&str> {
        self.defaults.last().and_then(Option::as_deref)
    }

    /// Sets the default namespace for the current depth.
    pub fn set_default(&mut self, uri: String) {
        if let Some(slot) = self.defaults.last_mut() {
            *slot = Some(uri);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_finds_sorted_entries() {
        let mut ns = NamespaceStack::new();
        ns.push_scope();
        ns.insert("zeta", "z".to_string());
        ns.insert("alpha", "a".to_string());
        ns.insert("mid", "m".to_string());
        assert_eq!(ns.resolve("alpha"), Some("a"));
        assert_eq!(ns.resolve("mid"), Some("m"));
        assert_eq!(ns.resolve("zeta"), Some("z"));
        assert_eq!(ns.resolve("missing"), None);
    }

    #[test]
    fn pop_prunes_bindings_declared_in_scope() {
        let mut ns = NamespaceStack::new();
        ns.push_scope();
        ns.insert("outer", "o".to_string());
        ns.push_scope();
        ns.insert("inner", "i".to_string());
        assert_eq!(ns.resolve("inner"), Some("i"));
        ns.pop_scope();
        assert_eq!(ns.resolve("inner"), None);
        assert_eq!(ns.resolve("outer"), Some("o"));
    }

    #[test]
    fn shadowed_binding_is_restored_on_pop() {
        let mut ns = NamespaceStack::new();
        ns.push_scope();
        ns.insert("n", "u1".to_string());
        ns.push_scope();
        ns.insert("n", "u2".to_string());
        assert_eq!(ns.resolve("n"), Some("u2"));
        ns.pop_scope();
        assert_eq!(ns.resolve("n"), Some("u1"));
        ns.pop_scope();
        assert_eq!(ns.resolve("n"), None);
    }

    #[test]
    fn shadow_restore_survives_interleaved_inserts() {
        let mut ns = NamespaceStack::new();
        ns.push_scope();
        ns.insert("n", "u1".to_string());
        ns.push_scope();
        ns.insert("n", "u2".to_string());
        // Sorts before "n", shifting its index after the shadow was recorded.
        ns.insert("a", "x".to_string());
        ns.pop_scope();
        assert_eq!(ns.resolve("n"), Some("u1"));
        assert_eq!(ns.resolve("a"), None);
    }

    #[test]
    fn default_namespace_inherits_and_reverts() {
        let mut ns = NamespaceStack::new();
        ns.push_scope();
        ns.set_default("d1".to_string());
        ns.push_scope();
        assert_eq!(ns.default_uri(), Some("d1"));
        ns.set_default("d2".to_string());
        assert_eq!(ns.default_uri(), Some("d2"));
        ns.pop_scope();
        assert_eq!(ns.default_uri(), Some("d1"));
        ns.pop_scope();
        assert_eq!(ns.default_uri(), None);
    }
}
