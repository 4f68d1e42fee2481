
/// Value a finished task hands back through its join handle.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Int(i64),
    None,
}
