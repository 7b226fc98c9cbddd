//! The semantic element tree walked during diagnostic collection.

use std::fmt;

use strata_resolve::{Declaration, DeclarationId, DeclarationKind, ResolutionSession, ResolveError};

/// Identity of a semantic element.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum ElementId {
    /// A declaration of the session, generated accessors included.
    Declaration(DeclarationId),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::Declaration(id) => write!(f, "declaration #{}", id.as_raw()),
        }
    }
}

/// A view of one element and the elements reachable from it.
///
/// Reachability has two flavours. Containment children are owned by the
/// element: class members and the accessors generated for a property. Shared
/// children are owned elsewhere and only referenced: a generated accessor
/// refers back to its backing property. A walk over both reaches shared
/// elements more than once, which is why every walk needs deduplication.
pub struct SemanticElement<'s> {
    id: ElementId,
    declaration: &'s Declaration,
}

impl<'s> SemanticElement<'s> {
    /// Looks up `id` in `session`.
    pub fn new(session: &'s ResolutionSession, id: ElementId) -> Result<Self, ResolveError> {
        let ElementId::Declaration(declaration) = id;
        Ok(Self {
            id,
            declaration: session.declaration(declaration)?,
        })
    }

    /// The element's identity.
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// The underlying declaration.
    pub fn declaration(&self) -> &'s Declaration {
        self.declaration
    }

    /// Elements owned by this one.
    pub fn children(&self) -> Vec<ElementId> {
        self.declaration
            .children()
            .iter()
            .copied()
            .map(ElementId::Declaration)
            .collect()
    }

    /// Elements this one refers to without owning them.
    pub fn shared(&self) -> Vec<ElementId> {
        match self.declaration.kind {
            DeclarationKind::Accessor { property, .. } => vec![ElementId::Declaration(property)],
            _ => Vec::new(),
        }
    }

    /// Owned children followed by shared ones.
    pub fn reachable(&self) -> Vec<ElementId> {
        let mut all = self.children();
        all.extend(self.shared());
        all
    }
}
