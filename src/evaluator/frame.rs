use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::Value;

/// A lexical scope: insertion-ordered bindings plus a shared link to the enclosing scope.
///
/// Frames are handles; cloning one yields another reference to the same scope. Every
/// closure created in a scope and every scope nested in it holds such a reference, so the
/// frame stays alive for as long as anything can still see it. Child scopes only link to
/// their parent, bindings are never copied when chaining.
///
/// Redefinition appends a new binding and lookups scan from the most recent one, so a later
/// `define` of the same name shadows the earlier binding without removing it.
#[derive(Clone)]
pub struct Frame(Rc<FrameData>);

struct FrameData {
    bindings: RefCell<Vec<(String, Value)>>,
    parent: Option<Frame>,
}

impl Frame {
    /// A frame with no parent (the global frame)
    pub fn new() -> Self {
        Frame(Rc::new(FrameData {
            bindings: RefCell::new(Vec::new()),
            parent: None,
        }))
    }

    /// A new empty frame whose parent is `self`
    pub fn child(&self) -> Self {
        Frame(Rc::new(FrameData {
            bindings: RefCell::new(Vec::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn parent(&self) -> Option<&Frame> {
        self.0.parent.as_ref()
    }

    /// Add a binding to this frame, shadowing any earlier binding of the same name
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().push((name.into(), value));
    }

    /// Look `name` up in this frame, then in each ancestor in turn
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut frame = self;
        loop {
            if let Some(value) = frame.lookup_local(name) {
                return Some(value);
            }
            frame = frame.parent()?;
        }
    }

    fn lookup_local(&self, name: &str) -> Option<Value> {
        self.0
            .bindings
            .borrow()
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.clone())
    }

    /// Whether this frame itself (ignoring ancestors) binds `name`
    pub fn contains_local(&self, name: &str) -> bool {
        self.0
            .bindings
            .borrow()
            .iter()
            .any(|(bound, _)| bound == name)
    }

    /// Assign `value` to the nearest frame in the chain that binds `name`, replacing every
    /// binding of `name` in that frame. Returns `false` if no frame binds it.
    pub fn set(&self, name: &str, value: Value) -> bool {
        let mut frame = self;
        loop {
            {
                let mut bindings = frame.0.bindings.borrow_mut();
                let mut found = false;
                for (bound, slot) in bindings.iter_mut() {
                    if bound == name {
                        *slot = value.clone();
                        found = true;
                    }
                }
                if found {
                    return true;
                }
            }
            match frame.parent() {
                Some(parent) => frame = parent,
                None => return false,
            }
        }
    }

    /// Drop every binding of this frame
    pub fn clear(&self) {
        self.0.bindings.borrow_mut().clear();
    }

    pub fn ptr_eq(this: &Frame, other: &Frame) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    /// Get all bindings visible from this frame
    /// Returns a Vec of (name, value) pairs sorted by name
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = HashMap::new();

        // Start with parent bindings (so they can be overridden by local bindings)
        if let Some(parent) = self.parent() {
            for (name, value) in parent.get_all_bindings() {
                bindings.insert(name, value);
            }
        }

        // Later entries shadow earlier ones, matching lookup order
        for (name, value) in self.0.bindings.borrow().iter() {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    fn depth(&self) -> usize {
        std::iter::successors(self.parent(), |frame| frame.parent()).count()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        Frame::ptr_eq(self, other)
    }
}

impl fmt::Debug for Frame {
    // Values are not printed: a frame often holds closures that capture the frame itself
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("bindings", &self.0.bindings.borrow().len())
            .field("depth", &self.depth())
            .finish()
    }
}
