//! Demand-driven, phase-ordered declaration resolution.
//!
//! A [`ResolutionSession`] owns the declarations of one module. Each
//! declaration moves independently through the totally ordered [`Phase`]
//! lattice, and only as far as a caller asks with
//! [`ResolutionSession::resolve_to`]. Phases are computed by pluggable
//! [`PhaseResolver`]s under a per-declaration lock; everything else (module
//! edges, imports, attributes) is cached lock-free.
//!
//! [`SessionProvider`] guarantees one session per module and analysis
//! configuration and discards them all when the project snapshot changes.

#![warn(missing_docs)]

pub mod attributes;
pub mod decl;
pub mod error;
pub mod phase;
pub mod provider;
pub mod resolvers;
pub mod services;
pub mod session;
pub mod state;

pub use attributes::DeclarationAttributes;
pub use decl::{
    AccessorKind, ClassKind, Declaration, DeclarationId, DeclarationKind, Import, Modality,
    Modifier, Modifiers, Parameter, RawDeclaration, RawDeclarationKind, SourceUnit, TypeName,
    Visibility,
};
pub use error::ResolveError;
pub use phase::Phase;
pub use provider::SessionProvider;
pub use resolvers::{builtin_resolvers, visible_modules, PhaseResolver, ResolveContext};
pub use services::{ExternalSymbols, ServiceRegistry};
pub use session::{ResolutionSession, SessionBuilder, SourceFile};
pub use state::{
    ImportTarget, PhaseFailure, ResolvedImport, ResolvedState, ResolvedType, SupertypeRef,
};
