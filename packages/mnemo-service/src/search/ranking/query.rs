#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TierKind {
	/// Single-term queries.
	Prefix,
	Phrase,
	Conjunctive,
	Disjunctive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexicalTier {
	pub kind: TierKind,
	/// FTS5 `MATCH` expression.
	pub expr: String,
}

/// Query formulations from most to least precise. Search stops at the first one with a match.
pub fn build_tiers(query: &str) -> Vec<LexicalTier> {
	let terms = query.split_whitespace().map(quote_term).collect::<Vec<_>>();

	match terms.as_slice() {
		[] => Vec::new(),
		[term] => vec![LexicalTier { kind: TierKind::Prefix, expr: format!("{term}*") }],
		_ => {
			let prefixed = terms.iter().map(|term| format!("{term}*")).collect::<Vec<_>>();
			let phrase = query.split_whitespace().collect::<Vec<_>>().join(" ");

			vec![
				LexicalTier { kind: TierKind::Phrase, expr: quote_term(&phrase) },
				LexicalTier { kind: TierKind::Conjunctive, expr: prefixed.join(" AND ") },
				LexicalTier { kind: TierKind::Disjunctive, expr: prefixed.join(" OR ") },
			]
		},
	}
}

/// Wraps a term as an FTS5 string so operators and punctuation lose their meaning.
fn quote_term(term: &str) -> String {
	format!("\"{}\"", term.replace('"', "\"\""))
}
