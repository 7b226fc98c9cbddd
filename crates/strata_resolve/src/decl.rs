//! Declarations: the raw input trees and their arena form inside a session.
//!
//! A front end hands a session [`SourceUnit`]s made of nested
//! [`RawDeclaration`]s. The session flattens them into [`Declaration`]s
//! addressed by [`DeclarationId`], generating one accessor declaration per
//! accessor a property asks for.

use std::fmt;

use serde::{Deserialize, Serialize};
use strata_common::{FileId, Ident, Span};

strata_common::define_id!(
    /// Index of a declaration within one resolution session.
    DeclarationId
);

/// A modifier keyword as written in source.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Modifier {
    /// `public`
    Public,
    /// `internal`
    Internal,
    /// `protected`
    Protected,
    /// `private`
    Private,
    /// `final`
    Final,
    /// `open`
    Open,
    /// `abstract`
    Abstract,
    /// `sealed`
    Sealed,
    /// `override`
    Override,
    /// `contract`
    Contract,
}

impl Modifier {
    const ALL: [Modifier; 10] = [
        Modifier::Public,
        Modifier::Internal,
        Modifier::Protected,
        Modifier::Private,
        Modifier::Final,
        Modifier::Open,
        Modifier::Abstract,
        Modifier::Sealed,
        Modifier::Override,
        Modifier::Contract,
    ];

    fn bit(self) -> u16 {
        1 << self as u8
    }

    /// Returns the keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Modifier::Public => "public",
            Modifier::Internal => "internal",
            Modifier::Protected => "protected",
            Modifier::Private => "private",
            Modifier::Final => "final",
            Modifier::Open => "open",
            Modifier::Abstract => "abstract",
            Modifier::Sealed => "sealed",
            Modifier::Override => "override",
            Modifier::Contract => "contract",
        }
    }
}

/// The set of modifier keywords written on a declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Modifiers(u16);

impl Modifiers {
    /// The empty set.
    pub const EMPTY: Modifiers = Modifiers(0);

    /// Returns `true` if `modifier` was written.
    pub fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    /// Returns the set with `modifier` added.
    pub fn with(self, modifier: Modifier) -> Self {
        Modifiers(self.0 | modifier.bit())
    }

    /// Returns `true` if no modifier was written.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over the written modifiers in keyword order.
    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }

    /// Returns the explicitly written visibility, if any.
    pub fn visibility(self) -> Option<Visibility> {
        Visibility::ALL
            .into_iter()
            .find(|v| self.contains(v.modifier()))
    }

    /// Returns the explicitly written modality, if any.
    pub fn modality(self) -> Option<Modality> {
        Modality::ALL
            .into_iter()
            .find(|m| self.contains(m.modifier()))
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<T: IntoIterator<Item = Modifier>>(iter: T) -> Self {
        iter.into_iter().fold(Modifiers::EMPTY, Modifiers::with)
    }
}

impl fmt::Debug for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(Modifier::keyword))
            .finish()
    }
}

/// Effective visibility of a declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Visibility {
    /// Visible everywhere.
    Public,
    /// Visible inside the module and its friends.
    Internal,
    /// Visible to subclasses.
    Protected,
    /// Visible inside the containing declaration.
    Private,
}

impl Visibility {
    /// Every visibility.
    pub const ALL: [Visibility; 4] = [
        Visibility::Public,
        Visibility::Internal,
        Visibility::Protected,
        Visibility::Private,
    ];

    /// Returns the modifier that spells this visibility.
    pub fn modifier(self) -> Modifier {
        match self {
            Visibility::Public => Modifier::Public,
            Visibility::Internal => Modifier::Internal,
            Visibility::Protected => Modifier::Protected,
            Visibility::Private => Modifier::Private,
        }
    }

    /// Returns the keyword, which is also the attribute name.
    pub fn keyword(self) -> &'static str {
        self.modifier().keyword()
    }

    /// Parses an attribute name.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.keyword() == keyword)
    }
}

/// Effective modality of a declaration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Modality {
    /// Cannot be overridden or subclassed.
    Final,
    /// May be overridden or subclassed.
    Open,
    /// Has no implementation.
    Abstract,
    /// Subclasses are restricted to the declaring module.
    Sealed,
}

impl Modality {
    /// Every modality.
    pub const ALL: [Modality; 4] = [
        Modality::Final,
        Modality::Open,
        Modality::Abstract,
        Modality::Sealed,
    ];

    /// Returns the modifier that spells this modality.
    pub fn modifier(self) -> Modifier {
        match self {
            Modality::Final => Modifier::Final,
            Modality::Open => Modifier::Open,
            Modality::Abstract => Modifier::Abstract,
            Modality::Sealed => Modifier::Sealed,
        }
    }

    /// Returns the keyword, which is also the attribute name.
    pub fn keyword(self) -> &'static str {
        self.modifier().keyword()
    }

    /// Parses an attribute name.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.keyword() == keyword)
    }
}

/// What kind of class a class declaration is.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ClassKind {
    /// A regular class.
    Class,
    /// An interface; its members are abstract unless stated otherwise.
    Interface,
    /// A singleton object.
    Object,
    /// An enumeration.
    Enum,
}

/// A generated property accessor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AccessorKind {
    /// Reads the property.
    Getter,
    /// Writes the property.
    Setter,
}

/// A reference to a type by name, as written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct TypeName {
    /// The referenced name.
    pub name: Ident,
    /// Where the reference is written.
    pub span: Span,
}

impl TypeName {
    /// Creates a type reference.
    pub fn new(name: Ident, span: Span) -> Self {
        Self { name, span }
    }
}

/// A function parameter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: Ident,
    /// Declared type, or `None` if it must be inferred.
    pub type_ref: Option<TypeName>,
}

/// An import at the top of a source unit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Import {
    /// The imported module or package name.
    pub path: Ident,
    /// Where the import is written.
    pub span: Span,
}

/// The payload of a raw declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawDeclarationKind {
    /// A class-like declaration and its nested members.
    Class {
        /// The class flavour.
        class_kind: ClassKind,
        /// Supertype references in declaration order.
        supertypes: Vec<TypeName>,
        /// Nested declarations.
        members: Vec<RawDeclaration>,
    },
    /// A function.
    Function {
        /// Parameters in order.
        params: Vec<Parameter>,
        /// Declared return type.
        return_type: Option<TypeName>,
    },
    /// A property and the accessors to generate for it.
    Property {
        /// Declared type.
        type_ref: Option<TypeName>,
        /// Accessors to generate.
        accessors: Vec<AccessorKind>,
    },
    /// A type alias.
    TypeAlias {
        /// The aliased type.
        target: TypeName,
    },
}

/// A declaration as produced by a front end, before it enters a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDeclaration {
    /// Declared name.
    pub name: Ident,
    /// Source location of the declaration.
    pub span: Span,
    /// Modifiers as written.
    pub modifiers: Modifiers,
    /// Kind-specific payload.
    pub kind: RawDeclarationKind,
}

impl RawDeclaration {
    /// Creates a class-like declaration with no supertypes or members.
    pub fn class(name: Ident, class_kind: ClassKind, span: Span) -> Self {
        Self::with_kind(
            name,
            span,
            RawDeclarationKind::Class {
                class_kind,
                supertypes: Vec::new(),
                members: Vec::new(),
            },
        )
    }

    /// Creates a function without parameters or return type.
    pub fn function(name: Ident, span: Span) -> Self {
        Self::with_kind(
            name,
            span,
            RawDeclarationKind::Function {
                params: Vec::new(),
                return_type: None,
            },
        )
    }

    /// Creates a property without accessors.
    pub fn property(name: Ident, type_ref: Option<TypeName>, span: Span) -> Self {
        Self::with_kind(
            name,
            span,
            RawDeclarationKind::Property {
                type_ref,
                accessors: Vec::new(),
            },
        )
    }

    /// Creates a type alias.
    pub fn type_alias(name: Ident, target: TypeName, span: Span) -> Self {
        Self::with_kind(name, span, RawDeclarationKind::TypeAlias { target })
    }

    fn with_kind(name: Ident, span: Span, kind: RawDeclarationKind) -> Self {
        Self {
            name,
            span,
            modifiers: Modifiers::EMPTY,
            kind,
        }
    }

    /// Adds a modifier.
    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers = self.modifiers.with(modifier);
        self
    }

    /// Adds a supertype. Ignored unless this is a class.
    pub fn supertype(mut self, supertype: TypeName) -> Self {
        if let RawDeclarationKind::Class { supertypes, .. } = &mut self.kind {
            supertypes.push(supertype);
        }
        self
    }

    /// Adds a nested member. Ignored unless this is a class.
    pub fn member(mut self, member: RawDeclaration) -> Self {
        if let RawDeclarationKind::Class { members, .. } = &mut self.kind {
            members.push(member);
        }
        self
    }

    /// Adds a parameter. Ignored unless this is a function.
    pub fn param(mut self, param: Parameter) -> Self {
        if let RawDeclarationKind::Function { params, .. } = &mut self.kind {
            params.push(param);
        }
        self
    }

    /// Sets the return type. Ignored unless this is a function.
    pub fn returns(mut self, ty: TypeName) -> Self {
        if let RawDeclarationKind::Function { return_type, .. } = &mut self.kind {
            *return_type = Some(ty);
        }
        self
    }

    /// Requests a generated accessor. Ignored unless this is a property.
    pub fn accessor(mut self, accessor_kind: AccessorKind) -> Self {
        if let RawDeclarationKind::Property { accessors, .. } = &mut self.kind {
            accessors.push(accessor_kind);
        }
        self
    }
}

/// One source file's imports and top-level declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceUnit {
    /// File identity.
    pub file: FileId,
    /// Path of the file, for messages.
    pub path: String,
    /// Explicit imports.
    pub imports: Vec<Import>,
    /// Top-level declarations.
    pub declarations: Vec<RawDeclaration>,
}

impl SourceUnit {
    /// Creates an empty unit.
    pub fn new(file: FileId, path: impl Into<String>) -> Self {
        Self {
            file,
            path: path.into(),
            imports: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Adds an import.
    pub fn import(mut self, path: Ident, span: Span) -> Self {
        self.imports.push(Import { path, span });
        self
    }

    /// Adds a top-level declaration.
    pub fn declaration(mut self, declaration: RawDeclaration) -> Self {
        self.declarations.push(declaration);
        self
    }
}

/// The payload of a session declaration. Nested declarations are referred to
/// by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclarationKind {
    /// A class-like declaration.
    Class {
        /// The class flavour.
        class_kind: ClassKind,
        /// Supertype references in declaration order.
        supertypes: Vec<TypeName>,
        /// Nested declarations, excluding generated accessors.
        members: Vec<DeclarationId>,
    },
    /// A function.
    Function {
        /// Parameters in order.
        params: Vec<Parameter>,
        /// Declared return type.
        return_type: Option<TypeName>,
    },
    /// A property.
    Property {
        /// Declared type.
        type_ref: Option<TypeName>,
        /// Generated accessors.
        accessors: Vec<DeclarationId>,
    },
    /// A generated accessor. It aliases its backing property.
    Accessor {
        /// The backing property.
        property: DeclarationId,
        /// Getter or setter.
        accessor_kind: AccessorKind,
    },
    /// A type alias.
    TypeAlias {
        /// The aliased type.
        target: TypeName,
    },
}

/// A declaration owned by a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// This declaration's id.
    pub id: DeclarationId,
    /// Declared name. Accessors carry the name of their property.
    pub name: Ident,
    /// Source location.
    pub span: Span,
    /// File the declaration is written in.
    pub file: FileId,
    /// Modifiers as written. Accessors inherit their property's.
    pub modifiers: Modifiers,
    /// The enclosing class or property, if any.
    pub parent: Option<DeclarationId>,
    /// Kind-specific payload.
    pub kind: DeclarationKind,
}

impl Declaration {
    /// Returns `true` for classes, interfaces, objects and enums.
    pub fn is_class(&self) -> bool {
        matches!(self.kind, DeclarationKind::Class { .. })
    }

    /// Returns `true` for generated accessors.
    pub fn is_accessor(&self) -> bool {
        matches!(self.kind, DeclarationKind::Accessor { .. })
    }

    /// Returns the class kind if this is a class-like declaration.
    pub fn class_kind(&self) -> Option<ClassKind> {
        match self.kind {
            DeclarationKind::Class { class_kind, .. } => Some(class_kind),
            _ => None,
        }
    }

    /// Returns the declarations nested directly inside this one: class
    /// members and generated accessors.
    pub fn children(&self) -> &[DeclarationId] {
        match &self.kind {
            DeclarationKind::Class { members, .. } => members,
            DeclarationKind::Property { accessors, .. } => accessors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Interner;

    #[test]
    fn modifiers_set_operations() {
        let mods: Modifiers = [Modifier::Private, Modifier::Abstract].into_iter().collect();
        assert!(mods.contains(Modifier::Private));
        assert!(!mods.contains(Modifier::Public));
        assert_eq!(mods.visibility(), Some(Visibility::Private));
        assert_eq!(mods.modality(), Some(Modality::Abstract));
        assert_eq!(
            mods.iter().collect::<Vec<_>>(),
            vec![Modifier::Private, Modifier::Abstract]
        );
        assert!(Modifiers::EMPTY.is_empty());
        assert_eq!(Modifiers::EMPTY.visibility(), None);
    }

    #[test]
    fn keywords_round_trip() {
        for v in Visibility::ALL {
            assert_eq!(Visibility::from_keyword(v.keyword()), Some(v));
        }
        for m in Modality::ALL {
            assert_eq!(Modality::from_keyword(m.keyword()), Some(m));
        }
        assert_eq!(Visibility::from_keyword("abstract"), None);
    }

    #[test]
    fn builders_only_touch_matching_kinds() {
        let interner = Interner::new();
        let name = interner.get_or_intern("f");
        let ty = TypeName::new(interner.get_or_intern("Int"), Span::DUMMY);
        let f = RawDeclaration::function(name, Span::DUMMY)
            .supertype(ty)
            .returns(ty);
        assert_eq!(
            f.kind,
            RawDeclarationKind::Function {
                params: Vec::new(),
                return_type: Some(ty),
            }
        );
    }

    #[test]
    fn modifiers_debug_lists_keywords() {
        let mods = Modifiers::EMPTY.with(Modifier::Open);
        assert_eq!(format!("{mods:?}"), "{\"open\"}");
    }
}
