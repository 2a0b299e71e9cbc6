//! Patch merging
//!
//! Policies produce independent patches on disjoint paths. Merging is a plain
//! concatenation in call order: no deduplication, no reordering, no conflict
//! detection between lists.

use json_patch::{Patch, PatchOperation};

use crate::{Error, Result};

/// Concatenate patches in the order given
///
/// Fails if any operation is outside the `add`/`replace` subset the policies
/// emit.
pub fn merge_patches<I>(patches: I) -> Result<Patch>
where
    I: IntoIterator<Item = Patch>,
{
    let mut merged = Vec::new();

    for (index, patch) in patches.into_iter().enumerate() {
        for op in patch.0 {
            match op {
                PatchOperation::Add(_) | PatchOperation::Replace(_) => merged.push(op),
                other => {
                    return Err(Error::merge(format!(
                        "patch {index} contains unsupported operation {}",
                        operation_name(&other)
                    )))
                }
            }
        }
    }

    Ok(Patch(merged))
}

fn operation_name(op: &PatchOperation) -> &'static str {
    match op {
        PatchOperation::Add(_) => "add",
        PatchOperation::Remove(_) => "remove",
        PatchOperation::Replace(_) => "replace",
        PatchOperation::Move(_) => "move",
        PatchOperation::Copy(_) => "copy",
        PatchOperation::Test(_) => "test",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use json_patch::{AddOperation, RemoveOperation, ReplaceOperation};
    use jsonptr::PointerBuf;
    use serde_json::json;

    fn replace(tokens: &[&str], value: serde_json::Value) -> PatchOperation {
        PatchOperation::Replace(ReplaceOperation {
            path: PointerBuf::from_tokens(tokens.iter().copied()),
            value,
        })
    }

    fn add(tokens: &[&str], value: serde_json::Value) -> PatchOperation {
        PatchOperation::Add(AddOperation {
            path: PointerBuf::from_tokens(tokens.iter().copied()),
            value,
        })
    }

    #[test]
    fn test_merge_preserves_call_order() {
        let first = Patch(vec![replace(&["spec", "replicas"], json!(3))]);
        let second = Patch(vec![add(
            &["metadata", "annotations"],
            json!({"env-type": "test"}),
        )]);

        let merged = merge_patches([first, second]).expect("merge should succeed");

        assert_eq!(
            serde_json::to_value(&merged).expect("patch should serialize"),
            json!([
                {"op": "replace", "path": "/spec/replicas", "value": 3},
                {"op": "add", "path": "/metadata/annotations", "value": {"env-type": "test"}}
            ])
        );
    }

    #[test]
    fn test_merge_keeps_per_patch_order() {
        let first = Patch(vec![
            add(&["metadata", "labels"], json!({})),
            add(&["metadata", "labels", "tier"], json!("web")),
        ]);
        let second = Patch(vec![replace(&["spec", "replicas"], json!(1))]);

        let merged = merge_patches([first, second]).expect("merge should succeed");
        let paths: Vec<String> = merged
            .0
            .iter()
            .map(|op| match op {
                PatchOperation::Add(a) => a.path.to_string(),
                PatchOperation::Replace(r) => r.path.to_string(),
                _ => unreachable!(),
            })
            .collect();

        assert_eq!(
            paths,
            ["/metadata/labels", "/metadata/labels/tier", "/spec/replicas"]
        );
    }

    #[test]
    fn test_merge_does_not_deduplicate() {
        let op = replace(&["spec", "replicas"], json!(3));
        let merged = merge_patches([Patch(vec![op.clone()]), Patch(vec![op])])
            .expect("merge should succeed");
        assert_eq!(merged.0.len(), 2);
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = merge_patches(Vec::<Patch>::new()).expect("merge should succeed");
        assert!(merged.0.is_empty());
    }

    #[test]
    fn test_merge_rejects_unsupported_operation() {
        let bad = Patch(vec![PatchOperation::Remove(RemoveOperation {
            path: PointerBuf::from_tokens(["spec", "replicas"]),
        })]);

        let err = merge_patches([Patch(Vec::new()), bad]).unwrap_err();
        assert!(matches!(err, Error::Merge(_)));
        assert!(err.to_string().contains("patch 1 contains unsupported operation remove"));
    }
}
