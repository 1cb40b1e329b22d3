//! Picking the component function when none is named.

use super::{FunctionDescriptor, ModuleDescriptor};

/// Outcome of looking for the single public function of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery<'a> {
  Found(&'a FunctionDescriptor),
  None,
  /// More than one candidate; names in source order
  Ambiguous(Vec<String>),
}

/// Find the only public top-level function of `module`.
///
/// Functions whose name starts with `_` are not candidates. Classes never are.
pub fn discover(module: &ModuleDescriptor) -> Discovery<'_> {
  let candidates: Vec<&FunctionDescriptor> = module.functions.iter().filter(|f| f.is_public()).collect();

  match candidates.as_slice() {
    [] => Discovery::None,
    [only] => Discovery::Found(only),
    many => Discovery::Ambiguous(many.iter().map(|f| f.name.clone()).collect()),
  }
}
