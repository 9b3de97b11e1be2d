//! Package-listing templates.
//!
//! A template is a commented, category-grouped listing of every package in
//! the catalogue, ready for a user to uncomment the entries they want and
//! feed back in as a selection. `refresh_listing` rewrites an existing
//! listing in place, updating only the trailing description comments while
//! preserving the user's selection state.

use std::io::Write;
use std::path::Path;

use crate::catalog::CatalogData;
use crate::error::CoreError;
use crate::selection::{PackageSelection, RE_LISTING_LINE};

/// Flatten a short description onto one line; a missing description becomes
/// `???` so it does not go unnoticed in generated listings.
fn concat_short_description(desc: Option<&str>) -> String {
    match desc {
        Some(text) if !text.is_empty() => text
            .replace('\n', " ")
            .replace('\r', "")
            .trim_end()
            .to_string(),
        _ => "???".to_string(),
    }
}

/// Emit a template package listing for the catalogue.
///
/// Packages are grouped by category (the synthetic `All` group is skipped),
/// one line per package with its one-line description as a trailing
/// comment. Packages in `selection` are emitted uncommented; everything
/// else is commented out. In `terse` mode unselected packages and
/// categories with no selected member are omitted entirely.
///
/// # Errors
///
/// Returns any I/O error from the output stream.
pub fn make_template(
    data: &CatalogData,
    source_url: &str,
    selection: Option<&PackageSelection>,
    terse: bool,
    out: &mut dyn Write,
) -> std::io::Result<()> {
    let categories = data.categories();
    let timestamp = chrono::Local::now().format("%a %b %e %H:%M:%S %Y");

    writeln!(out, "# Package listing for cygmir (partial mirror tool)")?;
    writeln!(out, "# Autogenerated on {timestamp}")?;
    writeln!(out, "# from: {source_url}")?;
    writeln!(out)?;
    writeln!(
        out,
        "# This file contains listings of package names, one per line."
    )?;
    writeln!(
        out,
        "# Lines starting with '#' denote comments, with blank lines being ignored."
    )?;
    writeln!(
        out,
        "# The dependencies of any package listed here should be automatically"
    )?;
    writeln!(out, "# included in the mirror by cygmir.")?;

    for (category, members) in &categories {
        if category == "All" {
            continue;
        }
        if terse {
            let any_selected = members
                .iter()
                .any(|name| selection.is_some_and(|sel| sel.contains(name)));
            if !any_selected {
                continue;
            }
        }

        writeln!(out, "\n\n##\n## {category}\n##")?;

        for name in members {
            let selected = selection.is_some_and(|sel| sel.contains(name));
            if !selected && terse {
                continue;
            }
            let desc = concat_short_description(
                data.get(name).and_then(|record| record.get("sdesc")),
            );
            let (prefix, pad) = if selected { ("", " ") } else { ("#", "") };
            writeln!(out, "{prefix}{name:<28}   {pad}# {desc}")?;
        }
    }

    Ok(())
}

/// Rewrite a listing file in place, refreshing the description comment on
/// every recognised package line and leaving everything else untouched.
///
/// The new content is written to `<path>.new` first; the original is kept
/// as `<path><backup_suffix>` when a suffix is supplied, then the new file
/// moves into place.
///
/// # Errors
///
/// Fails with [`CoreError::ListingSyntax`] if a line matches no recognised
/// form, or with an I/O error from the rewrite.
pub fn refresh_listing(
    data: &CatalogData,
    path: &Path,
    backup_suffix: Option<&str>,
) -> Result<(), CoreError> {
    let origin = path.display().to_string();
    let text = std::fs::read_to_string(path)?;
    let mut updated = String::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim_end();
        let caps = RE_LISTING_LINE
            .captures(line)
            .ok_or_else(|| CoreError::ListingSyntax {
                origin: origin.clone(),
                line: index + 1,
            })?;

        // Either a live package line or a commented-out one; in both cases
        // the annotation (if any) is replaced with a fresh description.
        let refreshed = [("pkgname", "annot"), ("deselected", "desannot")]
            .into_iter()
            .find_map(|(name_group, annot_group)| {
                let name = caps.name(name_group)?;
                let annot = caps.name(annot_group)?;
                let desc = data.get(name.as_str())?.get("sdesc");
                Some(format!(
                    "{}# {}",
                    &line[..annot.start()],
                    concat_short_description(desc)
                ))
            });

        updated.push_str(refreshed.as_deref().unwrap_or(line));
        updated.push('\n');
    }

    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".new");
    let new_path = std::path::PathBuf::from(tmp);
    std::fs::write(&new_path, updated)?;

    if let Some(suffix) = backup_suffix {
        let mut backup = path.as_os_str().to_os_string();
        backup.push(suffix);
        let backup = std::path::PathBuf::from(backup);
        if backup.exists() {
            std::fs::remove_file(&backup)?;
        }
        std::fs::rename(path, &backup)?;
    } else {
        std::fs::remove_file(path)?;
    }
    std::fs::rename(&new_path, path)?;

    Ok(())
}
