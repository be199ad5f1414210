// Copyright 2025 the Tiledraw Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tiny `#import` resolver for the WGSL sources.

use std::collections::HashMap;

/// Splices shared snippets into a shader. A line of the form `#import name`
/// is replaced by the (recursively preprocessed) snippet registered under
/// that name; everything else passes through untouched.
pub fn preprocess(input: &str, imports: &HashMap<&str, &str>) -> String {
    let mut output = String::with_capacity(input.len());
    for (line_number, line) in input.lines().enumerate() {
        if let Some(rest) = line.trim_start().strip_prefix("#import") {
            let import_name = rest.trim();
            if let Some(import) = imports.get(import_name) {
                output.push_str(&preprocess(import, imports));
            } else {
                log::error!("unknown import `{import_name}` (line {line_number})");
            }
            continue;
        }
        output.push_str(line);
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imports_are_spliced_recursively() {
        let mut imports = HashMap::new();
        imports.insert("inner", "const A = 1u;");
        imports.insert("outer", "#import inner\nconst B = A + 1u;");
        let out = preprocess("#import outer\nfn main() {}\n", &imports);
        assert!(out.contains("const A = 1u;"));
        assert!(out.contains("const B = A + 1u;"));
        assert!(out.contains("fn main() {}"));
        assert!(!out.contains("#import"));
    }
}
