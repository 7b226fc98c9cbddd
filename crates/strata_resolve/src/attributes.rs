//! Visibility and modality of a declaration as cached yes/no attributes.

use std::fmt;
use std::sync::Weak;

use strata_cache::{
    exclusive_batch, AttributeCache, AttributeFamily, CacheError, MODALITY, VISIBILITY,
};

use crate::decl::{Declaration, DeclarationId, Modality, Visibility};
use crate::phase::Phase;
use crate::session::ResolutionSession;

/// The attribute cache of one declaration.
///
/// Attributes spelled out by a modifier are known up front. The others are
/// computed by resolving the declaration to [`Phase::Status`] and reading the
/// decided status, which answers the whole family in one batch.
pub struct DeclarationAttributes {
    cache: AttributeCache,
}

impl DeclarationAttributes {
    pub(crate) fn new(session: Weak<ResolutionSession>, declaration: &Declaration) -> Self {
        let id = declaration.id;
        let visibility = declaration.modifiers.visibility().map(Visibility::keyword);
        let modality = declaration.modifiers.modality().map(Modality::keyword);

        let cache = AttributeCache::new()
            .with_family(VISIBILITY, known(VISIBILITY, visibility), {
                let session = session.clone();
                move |_: &str| {
                    status_batch(&session, id, VISIBILITY, |session, id| {
                        let state = session.resolved(id).map_err(|e| e.to_string())?;
                        Ok(state.visibility.unwrap_or(Visibility::Public).keyword())
                    })
                }
            })
            .with_family(MODALITY, known(MODALITY, modality), move |_: &str| {
                status_batch(&session, id, MODALITY, |session, id| {
                    let state = session.resolved(id).map_err(|e| e.to_string())?;
                    Ok(state.modality.unwrap_or(Modality::Final).keyword())
                })
            });
        Self { cache }
    }

    /// Returns whether `attribute` of `family` holds.
    pub fn has(&self, family: &str, attribute: &str) -> Result<bool, CacheError> {
        self.cache.has_attribute(family, attribute)
    }

    /// Returns the effective visibility.
    pub fn visibility(&self) -> Result<Visibility, CacheError> {
        Ok(self
            .cache
            .value_of(VISIBILITY.name)?
            .and_then(Visibility::from_keyword)
            .unwrap_or(Visibility::Public))
    }

    /// Returns the effective modality.
    pub fn modality(&self) -> Result<Modality, CacheError> {
        Ok(self
            .cache
            .value_of(MODALITY.name)?
            .and_then(Modality::from_keyword)
            .unwrap_or(Modality::Final))
    }

    /// Returns `true` if the declaration is private.
    pub fn is_private(&self) -> Result<bool, CacheError> {
        self.has(VISIBILITY.name, Visibility::Private.keyword())
    }

    /// Returns `true` if the declaration is abstract.
    pub fn is_abstract(&self) -> Result<bool, CacheError> {
        self.has(MODALITY.name, Modality::Abstract.keyword())
    }

    /// Returns the underlying cache.
    pub fn cache(&self) -> &AttributeCache {
        &self.cache
    }
}

impl fmt::Debug for DeclarationAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.cache, f)
    }
}

fn known(family: AttributeFamily, written: Option<&'static str>) -> Vec<(&'static str, bool)> {
    match written {
        Some(winner) => family
            .members
            .iter()
            .map(|&member| (member, member == winner))
            .collect(),
        None => Vec::new(),
    }
}

fn status_batch(
    session: &Weak<ResolutionSession>,
    id: DeclarationId,
    family: AttributeFamily,
    pick: impl FnOnce(&ResolutionSession, DeclarationId) -> Result<&'static str, String>,
) -> Result<Option<rustc_hash::FxHashMap<String, bool>>, String> {
    let session = session
        .upgrade()
        .ok_or_else(|| "resolution session was dropped".to_string())?;
    session
        .resolve_to(id, Phase::Status)
        .map_err(|e| e.to_string())?;
    let winner = pick(&session, id)?;
    Ok(Some(exclusive_batch(family, winner)))
}
