//! Text tree of a finished run.
//!
//! The output root is printed one path component per line, each one level
//! deeper than the last. Groups hang below the final component and their
//! entry names below each group:
//!
//! ```text
//! out
//! └20261019153042_Ab3dE9xZ
//!  ├12345
//!  │├sample_12345.png
//!  │└12345_sample.png
//!  └67890
//!   ├sample_67890.txt
//!   └67890_sample.md
//! ```

use crate::grouping::RunManifest;

const BRANCH: char = '├';
const LAST_BRANCH: char = '└';
const PIPE: char = '│';

/// Label shown for the group whose key is the empty string.
const EMPTY_KEY_LABEL: &str = "\"\"";

/// Renders `manifest` as a tree. The result ends without a trailing newline.
pub fn render_tree(manifest: &RunManifest) -> String {
    let mut out = String::new();

    let components: Vec<String> = manifest
        .output_root
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    for (depth, component) in components.iter().enumerate() {
        if depth == 0 {
            push_line(&mut out, component);
        } else {
            push_line(&mut out, &format!("{}{LAST_BRANCH}{component}", indent(depth - 1)));
        }
    }

    let group_indent = indent(components.len().saturating_sub(1));
    let group_count = manifest.grouping.len();

    for (index, (key, names)) in manifest.grouping.iter().enumerate() {
        let last_group = index + 1 == group_count;
        let glyph = if last_group { LAST_BRANCH } else { BRANCH };
        let label = if key.is_empty() { EMPTY_KEY_LABEL } else { key };
        push_line(&mut out, &format!("{group_indent}{glyph}{label}"));

        let rail = if last_group { ' ' } else { PIPE };
        for (position, name) in names.iter().enumerate() {
            let glyph = if position + 1 == names.len() {
                LAST_BRANCH
            } else {
                BRANCH
            };
            push_line(&mut out, &format!("{group_indent}{rail}{glyph}{name}"));
        }
    }

    out
}

fn indent(width: usize) -> String {
    " ".repeat(width)
}

fn push_line(out: &mut String, line: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::Grouping;
    use std::path::PathBuf;

    #[test]
    fn test_render_groups_and_leaves() {
        let mut grouping = Grouping::new();
        grouping.push("12345", "sample_12345.png");
        grouping.push("12345", "12345_sample.png");
        grouping.push("67890", "sample_67890.txt");
        grouping.push("67890", "67890_sample.md");
        let manifest = RunManifest::new(PathBuf::from("out/run_1"), grouping);

        let expected = [
            "out",
            "└run_1",
            " ├12345",
            " │├sample_12345.png",
            " │└12345_sample.png",
            " └67890",
            "  ├sample_67890.txt",
            "  └67890_sample.md",
        ]
        .join("\n");
        assert_eq!(render_tree(&manifest), expected);
    }

    #[test]
    fn test_render_absolute_root_one_component_per_line() {
        let mut grouping = Grouping::new();
        grouping.push("k", "file");
        let manifest = RunManifest::new(PathBuf::from("/tmp/out"), grouping);

        let expected = ["/", "└tmp", " └out", "  └k", "   └file"].join("\n");
        assert_eq!(render_tree(&manifest), expected);
    }

    #[test]
    fn test_render_empty_key_label() {
        let mut grouping = Grouping::new();
        grouping.push("", "a.txt");
        let manifest = RunManifest::new(PathBuf::from("out"), grouping);

        assert_eq!(render_tree(&manifest), "out\n└\"\"\n └a.txt");
    }

    #[test]
    fn test_render_without_groups() {
        let manifest = RunManifest::new(PathBuf::from("out/run"), Grouping::new());
        assert_eq!(render_tree(&manifest), "out\n└run");
    }
}
