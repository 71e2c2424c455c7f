//! Static usage analysis for op bodies.
//!
//! A service op declares the ports it requires and consumes them through a
//! single access path: `deps.call("port_name", args)`. This crate extracts
//! the set of port names an op body invokes that way, without executing
//! anything, so a service definition can verify that its declared needs and
//! the needs its ops actually reference agree.
//!
//! The scan is a conservative pass over the parsed block:
//!
//! * calls nested inside argument expressions, branch arms, loops and
//!   closure bodies all count;
//! * comments never contribute, and string literal *content* is never
//!   scanned; a literal only matters as the name argument of an access call;
//! * a bare read of `deps` contributes nothing, and neither does a call on
//!   any receiver other than the plain identifier `deps` (field accesses
//!   like `self.deps` and rebound aliases stay invisible);
//! * a non-literal name argument is invisible to the scan;
//! * repeated calls on one name dedup.
//!
//! Macro arguments are left unparsed by the syntax tree, so inside them the
//! scan drops to token level and looks for the `deps.call("name", ...)`
//! shape directly, with the same receiver rules.

#![warn(missing_docs)]

use std::collections::BTreeSet;

use proc_macro2::{Delimiter, TokenStream, TokenTree};
use syn::visit::{self, Visit};
use syn::{Expr, ExprMethodCall, Lit};

/// Errors reported by the analyzer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DepScanError {
	/// The op body is not parseable as a block.
	#[error("op body is not a valid block: {0}")]
	Parse(String),
}

/// Returns the sorted set of port names `body` invokes via
/// `deps.call("...", ...)`.
///
/// `body` must be the source text of a block, braces included, which is the
/// shape `stringify!` produces for a captured `$body:block`.
pub fn deps_called(body: &str) -> Result<BTreeSet<String>, DepScanError> {
	let block: syn::Block = syn::parse_str(body).map_err(|err| DepScanError::Parse(err.to_string()))?;
	let mut finder = DepCallFinder::default();
	finder.visit_block(&block);
	Ok(finder.found)
}

#[derive(Default)]
struct DepCallFinder {
	found: BTreeSet<String>,
}

impl<'ast> Visit<'ast> for DepCallFinder {
	fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
		if node.method == "call" && is_bare_deps(&node.receiver) {
			if let Some(name) = literal_name(node.args.iter().next()) {
				self.found.insert(name);
			}
		}
		// Nested calls hide in the receiver chain and in every argument.
		visit::visit_expr_method_call(self, node);
	}

	fn visit_macro(&mut self, node: &'ast syn::Macro) {
		self.scan_tokens(node.tokens.clone());
		visit::visit_macro(self, node);
	}
}

impl DepCallFinder {
	/// Token-level scan used inside macro arguments, recursing through
	/// every delimited group.
	fn scan_tokens(&mut self, tokens: TokenStream) {
		let trees: Vec<TokenTree> = tokens.into_iter().collect();
		for (index, tree) in trees.iter().enumerate() {
			match tree {
				TokenTree::Group(group) => self.scan_tokens(group.stream()),
				TokenTree::Ident(ident) if ident == "deps" && !is_member_access(&trees, index) => {
					if let Some(name) = access_call_name(&trees[index + 1..]) {
						self.found.insert(name);
					}
				}
				_ => {}
			}
		}
	}
}

/// True when the receiver is exactly the identifier `deps`, modulo
/// parentheses. A field access ending in `deps` does not qualify.
fn is_bare_deps(receiver: &Expr) -> bool {
	match receiver {
		Expr::Path(path) => path.qself.is_none() && path.path.is_ident("deps"),
		Expr::Paren(paren) => is_bare_deps(&paren.expr),
		Expr::Group(group) => is_bare_deps(&group.expr),
		_ => false,
	}
}

/// Extracts the port name when the first call argument is a string literal.
fn literal_name(arg: Option<&Expr>) -> Option<String> {
	match arg {
		Some(Expr::Lit(lit)) => match &lit.lit {
			Lit::Str(name) => Some(name.value()),
			_ => None,
		},
		_ => None,
	}
}

/// True when the `deps` token at `index` is a member of a larger path or
/// field chain (`self.deps`, `foo::deps`) rather than the bare identifier.
///
/// A single preceding `:` does not disqualify it, so `deps` used as a value
/// after a key in a map-building macro still counts.
fn is_member_access(trees: &[TokenTree], index: usize) -> bool {
	if index == 0 {
		return false;
	}
	match &trees[index - 1] {
		TokenTree::Punct(punct) if punct.as_char() == '.' => true,
		TokenTree::Punct(punct) if punct.as_char() == ':' => {
			index >= 2 && matches!(&trees[index - 2], TokenTree::Punct(prev) if prev.as_char() == ':')
		}
		_ => false,
	}
}

/// Extracts the name from a `.call("name", ...)` token suffix.
fn access_call_name(rest: &[TokenTree]) -> Option<String> {
	match rest {
		[TokenTree::Punct(dot), TokenTree::Ident(method), TokenTree::Group(args), ..]
			if dot.as_char() == '.' && method == "call" && args.delimiter() == Delimiter::Parenthesis =>
		{
			match args.stream().into_iter().next()? {
				TokenTree::Literal(literal) => match Lit::new(literal) {
					Lit::Str(name) => Some(name.value()),
					_ => None,
				},
				_ => None,
			}
		}
		_ => None,
	}
}
