mod policy;
mod query;
mod retrieval;

pub(super) use policy::{final_score, frequency_boost, recency_boost, resolve_weights};
pub(super) use query::{LexicalTier, build_tiers};
pub(super) use retrieval::{cmp_f32_desc, merge_candidates, rrf_fusion};

#[cfg(test)] pub(super) use query::TierKind;
