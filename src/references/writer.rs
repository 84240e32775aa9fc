//! Idempotent injection of a reference set into an F# project descriptor.

use super::{Reference, ReferenceContainer};
use crate::error::SyncError;
use crate::fs::FileSystem;
use roxmltree::{Document, Node};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, info};

/// Marker attribute on every `<ItemGroup>` this tool generates, so ownership
/// detection on later runs is exact instead of structural guesswork.
pub const OWNERSHIP_LABEL: &str = "fsbridge";

/// Which optional reference groups to emit.
#[derive(Debug, Clone)]
pub struct WritePolicy {
    pub reference_csharp_dll: bool,
    pub include_additional: bool,
}

/// Rewrite `descriptor`'s reference groups from `refs`.
///
/// Previously generated groups are removed first, so re-running with the same
/// container is byte-for-byte idempotent. Unlabeled groups whose first element
/// child is a `Reference` declaration are also reclaimed; that is how the
/// original C# tooling marked its groups, and descriptors it wrote migrate
/// cleanly on the first pass. Everything else in the document is preserved
/// untouched.
pub fn write_references(
    fs: &dyn FileSystem,
    descriptor: &Path,
    refs: &ReferenceContainer,
    policy: &WritePolicy,
) -> Result<(), SyncError> {
    let content = fs.read_to_string(descriptor)?;
    let rewritten = rewrite(&content, refs, policy).map_err(|message| SyncError::Parse {
        path: descriptor.to_path_buf(),
        message,
    })?;
    fs.write(descriptor, &rewritten)?;

    debug!(descriptor = %descriptor.display(), "reference groups rewritten");
    Ok(())
}

fn rewrite(
    content: &str,
    refs: &ReferenceContainer,
    policy: &WritePolicy,
) -> Result<String, String> {
    let doc = Document::parse(content).map_err(|e| e.to_string())?;
    let root = doc.root_element();

    let mut removals: Vec<Range<usize>> = Vec::new();
    for node in root.descendants() {
        if node.is_element() && node.has_tag_name("ItemGroup") && is_owned_group(&node) {
            let range = expand_range(content, node.range());
            let overlaps = removals
                .iter()
                .any(|r| r.start < range.end && range.start < r.end);
            if !overlaps {
                removals.push(range);
            }
        }
    }
    removals.sort_by_key(|r| r.start);

    // Insertion point: just before the root element's close tag.
    let root_range = root.range();
    let insert_at = content[..root_range.end]
        .rfind("</")
        .ok_or_else(|| format!("root element <{}> has no close tag", root.tag_name().name()))?;

    let mut groups = String::new();
    groups.push_str(&render_group(&[&refs.unity_engine, &refs.unity_editor]));
    if policy.reference_csharp_dll {
        if let Some(csharp) = &refs.csharp_dll {
            groups.push_str(&render_group(&[csharp]));
        } else {
            info!("no C# project dll was found to reference");
        }
    }
    if policy.include_additional && !refs.additional.is_empty() {
        let additional: Vec<&Reference> = refs.additional.iter().collect();
        groups.push_str(&render_group(&additional));
    }

    let mut out = String::with_capacity(content.len() + groups.len());
    let mut pos = 0;
    for range in &removals {
        out.push_str(&content[pos..range.start]);
        pos = range.end;
    }
    out.push_str(&content[pos..insert_at]);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&groups);
    out.push_str(&content[insert_at..]);

    Ok(out)
}

/// A group is ours when it carries the ownership marker, or (legacy layout)
/// when its first element child is a `Reference` declaration.
fn is_owned_group(group: &Node) -> bool {
    if group.attribute("Label") == Some(OWNERSHIP_LABEL) {
        return true;
    }
    group
        .first_element_child()
        .map(|child| child.has_tag_name("Reference"))
        .unwrap_or(false)
}

/// Swallow the group's leading indentation and trailing newline so removal
/// undoes an earlier injection exactly.
fn expand_range(content: &str, mut range: Range<usize>) -> Range<usize> {
    let bytes = content.as_bytes();
    while range.start > 0 && matches!(bytes[range.start - 1], b' ' | b'\t') {
        range.start -= 1;
    }
    if bytes.get(range.end) == Some(&b'\r') {
        range.end += 1;
    }
    if bytes.get(range.end) == Some(&b'\n') {
        range.end += 1;
    }
    range
}

fn render_group(references: &[&Reference]) -> String {
    let mut group = format!("  <ItemGroup Label=\"{}\">\n", OWNERSHIP_LABEL);
    for reference in references {
        group.push_str(&format!(
            "    <Reference Include=\"{}\">\n      <HintPath>{}</HintPath>\n    </Reference>\n",
            escape_xml(&reference.include),
            escape_xml(&reference.hint_path)
        ));
    }
    group.push_str("  </ItemGroup>\n");
    group
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::path::PathBuf;

    const FSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <TargetFramework>netstandard2.1</TargetFramework>
  </PropertyGroup>
  <ItemGroup>
    <Compile Include="Library.fs" />
  </ItemGroup>
</Project>
"#;

    fn container() -> ReferenceContainer {
        ReferenceContainer {
            unity_engine: Reference::new("UnityEngine", "/unity/Managed/UnityEngine.dll"),
            unity_editor: Reference::new("UnityEditor", "/unity/Managed/UnityEditor.dll"),
            csharp_dll: Some(Reference::new(
                "Assembly-CSharp",
                "/unity/Temp/bin/Debug/Assembly-CSharp.dll",
            )),
            additional: vec![Reference::new(
                "Newtonsoft.Json",
                "/unity/Packages/Newtonsoft.Json.dll",
            )],
        }
    }

    fn mandatory_only() -> WritePolicy {
        WritePolicy {
            reference_csharp_dll: false,
            include_additional: false,
        }
    }

    fn everything() -> WritePolicy {
        WritePolicy {
            reference_csharp_dll: true,
            include_additional: true,
        }
    }

    fn write_to_mock(content: &str, refs: &ReferenceContainer, policy: &WritePolicy) -> String {
        let fs = MockFileSystem::new();
        let path = PathBuf::from("/mock/Assembly-FSharp.fsproj");
        fs.add_file(&path, content);
        write_references(&fs, &path, refs, policy).unwrap();
        fs.read_to_string(&path).unwrap()
    }

    #[test]
    fn test_appends_mandatory_group() {
        let result = write_to_mock(FSPROJ, &container(), &mandatory_only());

        assert!(result.contains(r#"<ItemGroup Label="fsbridge">"#));
        assert!(result.contains(r#"<Reference Include="UnityEngine">"#));
        assert!(result.contains("<HintPath>/unity/Managed/UnityEngine.dll</HintPath>"));
        assert!(result.contains(r#"<Reference Include="UnityEditor">"#));
        assert!(!result.contains("Newtonsoft.Json"));
        assert!(!result.contains("Assembly-CSharp"));
    }

    #[test]
    fn test_policy_gates_optional_groups() {
        let result = write_to_mock(FSPROJ, &container(), &everything());

        assert!(result.contains(r#"<Reference Include="Assembly-CSharp">"#));
        assert!(result.contains(r#"<Reference Include="Newtonsoft.Json">"#));
        assert_eq!(result.matches("<ItemGroup Label=\"fsbridge\">").count(), 3);
    }

    #[test]
    fn test_missing_csharp_dll_is_non_fatal() {
        let refs = ReferenceContainer {
            csharp_dll: None,
            ..container()
        };
        let result = write_to_mock(FSPROJ, &refs, &everything());

        assert!(!result.contains("Assembly-CSharp"));
        assert!(result.contains(r#"<Reference Include="UnityEngine">"#));
    }

    #[test]
    fn test_idempotent_byte_for_byte() {
        let once = write_to_mock(FSPROJ, &container(), &everything());
        let twice = write_to_mock(&once, &container(), &everything());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_user_groups_survive() {
        let result = write_to_mock(FSPROJ, &container(), &everything());
        assert!(result.contains(r#"<Compile Include="Library.fs" />"#));

        let again = write_to_mock(&result, &container(), &everything());
        assert!(again.contains(r#"<Compile Include="Library.fs" />"#));
    }

    #[test]
    fn test_reclaims_legacy_unlabeled_group() {
        let legacy = r#"<Project Sdk="Microsoft.NET.Sdk">
  <ItemGroup>
    <Reference Include="UnityEngine">
      <HintPath>/stale/UnityEngine.dll</HintPath>
    </Reference>
  </ItemGroup>
</Project>
"#;
        let result = write_to_mock(legacy, &container(), &mandatory_only());

        assert!(!result.contains("/stale/UnityEngine.dll"));
        assert_eq!(result.matches(r#"<Reference Include="UnityEngine">"#).count(), 1);
    }

    #[test]
    fn test_malformed_descriptor() {
        let fs = MockFileSystem::new();
        let path = PathBuf::from("/mock/Broken.fsproj");
        fs.add_file(&path, "<Project><ItemGroup></Project>");

        let err = write_references(&fs, &path, &container(), &mandatory_only()).unwrap_err();
        assert!(matches!(err, SyncError::Parse { .. }));
    }

    #[test]
    fn test_escapes_reference_values() {
        let refs = ReferenceContainer {
            unity_engine: Reference::new("UnityEngine", "/path/with space & <odd>/UnityEngine.dll"),
            ..container()
        };
        let result = write_to_mock(FSPROJ, &refs, &mandatory_only());

        assert!(result.contains("/path/with space &amp; &lt;odd&gt;/UnityEngine.dll"));
    }
}
