//! Source scanning: Rust source unit → route bindings.
//!
//! Annotations live in outer doc comments on functions, free or inside an
//! `impl` block:
//!
//! ```rust,ignore
//! impl Handler {
//!     /// Returns one person.
//!     /// @RestOperation( method = "GET", path = "/person/{uid}" )
//!     fn get_person(&self, res: &mut Response, req: &mut Request) { ... }
//! }
//! ```
//!
//! The unit is parsed with `syn`, so `///` and `/** */` comments are seen as
//! `#[doc]` attributes and plain `//` comments are not seen at all. Only
//! top-level items are visited: free `fn`s and the `fn`s of top-level `impl`
//! blocks. Inline `mod` blocks are not descended into.

use std::path::Path;

use syn::{Attribute, Expr, ExprLit, ImplItem, Item, Lit, Meta, Type};

use crate::descriptor::{self, RouteDescriptor, MARKER};
use crate::error::ScanError;

/// A descriptor plus where it was declared.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteBinding {
    pub descriptor: RouteDescriptor,
    /// The annotated function's name.
    pub handler_method: String,
    /// The `impl` block's type, or empty for a free function.
    pub handler_type: String,
    /// Module the declaration came from; only used in route names.
    pub package: String,
}

impl RouteBinding {
    /// `package.Type.method`, the name the route is registered under. A free
    /// function gives `package..method`.
    pub fn route_name(&self) -> String {
        format!("{}.{}.{}", self.package, self.handler_type, self.handler_method)
    }
}

/// Scans source units for annotated declarations.
#[derive(Clone, Debug, Default)]
pub struct Scanner {
    package: Option<String>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the package recorded on every binding. Without it, files
    /// use their module name and in-memory sources use `crate`.
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    /// Reads and scans one file. Fails on the first bad annotation; nothing
    /// found before it is returned.
    pub fn scan(&self, path: impl AsRef<Path>) -> Result<Vec<RouteBinding>, ScanError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ScanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let package = self.package.clone().unwrap_or_else(|| module_name(path));
        scan_unit(&path.display().to_string(), &source, &package)
    }

    /// Scans source text that is already in memory.
    pub fn scan_source(&self, source: &str) -> Result<Vec<RouteBinding>, ScanError> {
        let package = self.package.as_deref().unwrap_or("crate");
        scan_unit("<source>", source, package)
    }
}

/// Scans one file with the default settings.
pub fn scan(path: impl AsRef<Path>) -> Result<Vec<RouteBinding>, ScanError> {
    Scanner::new().scan(path)
}

/// Scans in-memory source, recording `package` on every binding.
pub fn scan_source(source: &str, package: &str) -> Result<Vec<RouteBinding>, ScanError> {
    Scanner::new().package(package).scan_source(source)
}

fn scan_unit(unit: &str, source: &str, package: &str) -> Result<Vec<RouteBinding>, ScanError> {
    let file = syn::parse_file(source).map_err(|err| ScanError::Syntax {
        unit: unit.to_owned(),
        source: err,
    })?;

    let mut bindings = Vec::new();
    for item in &file.items {
        match item {
            Item::Fn(f) => {
                let name = f.sig.ident.to_string();
                if let Some(binding) = bind_declaration(&f.attrs, name, String::new(), package)? {
                    bindings.push(binding);
                }
            }
            Item::Impl(block) => {
                let owner = owner_name(&block.self_ty);
                for member in &block.items {
                    let ImplItem::Fn(f) = member else { continue };
                    let name = f.sig.ident.to_string();
                    if let Some(binding) = bind_declaration(&f.attrs, name, owner.clone(), package)? {
                        bindings.push(binding);
                    }
                }
            }
            _ => {}
        }
    }

    tracing::debug!(unit, package, routes = bindings.len(), "scanned source unit");
    Ok(bindings)
}

fn bind_declaration(
    attrs: &[Attribute],
    method: String,
    owner: String,
    package: &str,
) -> Result<Option<RouteBinding>, ScanError> {
    let lines = doc_lines(attrs);
    let Some(annotation) = first_annotation(&lines) else {
        return Ok(None);
    };

    let declaration = if owner.is_empty() { method.clone() } else { format!("{owner}::{method}") };
    if annotation.extra_markers > 0 {
        tracing::warn!(
            declaration = %declaration,
            ignored = annotation.extra_markers,
            "multiple {MARKER} annotations on one declaration; only the first is used"
        );
    }

    let descriptor = descriptor::parse(&annotation.text)
        .map_err(|source| ScanError::AnnotationParse { declaration, source })?;

    Ok(Some(RouteBinding {
        descriptor,
        handler_method: method,
        handler_type: owner,
        package: package.to_owned(),
    }))
}

/// The doc comment text of an item, one entry per line.
fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit { lit: Lit::Str(text), .. }) => Some(text.value()),
                _ => None,
            },
            _ => None,
        })
        .flat_map(|text| {
            // A `/** */` block arrives as one multi-line string whose lines
            // usually carry a leading ` * ` gutter.
            let block = text.contains('\n');
            text.lines()
                .map(|line| if block { strip_gutter(line) } else { line })
                .map(str::to_owned)
                .collect::<Vec<_>>()
        })
        .collect()
}

fn strip_gutter(line: &str) -> &str {
    let trimmed = line.trim_start();
    trimmed.strip_prefix('*').unwrap_or(trimmed)
}

struct Annotation {
    text: String,
    extra_markers: usize,
}

/// Picks the first line carrying the marker. When its parameter list is not
/// closed on that line, following lines are joined on until one holds `)`.
fn first_annotation(lines: &[String]) -> Option<Annotation> {
    let start = lines.iter().position(|line| line.contains(MARKER))?;

    let mut text = lines[start].trim().to_owned();
    let mut end = start;
    let closed = |text: &str| text.split_once(MARKER).is_some_and(|(_, rest)| rest.contains(')'));
    while !closed(&text) && end + 1 < lines.len() {
        end += 1;
        text.push(' ');
        text.push_str(lines[end].trim());
    }

    let extra_markers = lines[end + 1..].iter().filter(|line| line.contains(MARKER)).count();
    Some(Annotation { text, extra_markers })
}

/// `Handler`, `&Handler`, `&'a mut Handler`, `crate::x::Handler<T>` → `Handler`.
fn owner_name(ty: &Type) -> String {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()).unwrap_or_default(),
        Type::Reference(r) => owner_name(&r.elem),
        Type::Paren(p) => owner_name(&p.elem),
        Type::Group(g) => owner_name(&g.elem),
        _ => String::new(),
    }
}

/// `src/person.rs` → `person`, `src/person/mod.rs` → `person`,
/// `src/lib.rs` → `crate`.
fn module_name(path: &Path) -> String {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("crate");
    match stem {
        "lib" | "main" => "crate".to_owned(),
        "mod" => path
            .parent()
            .and_then(Path::file_name)
            .and_then(|s| s.to_str())
            .unwrap_or("crate")
            .to_owned(),
        other => other.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseError;
    use crate::method::Method;

    #[test]
    fn finds_annotated_methods_in_source_order() {
        let src = r#"
            pub struct Service;

            impl Service {
                /// @RestOperation( method = "GET", path = "/users" )
                pub fn get_users(&self) {}

                /// Not a route.
                pub fn helper(&self) {}

                /// @RestOperation( method = "POST", path = "/users" )
                pub fn create_user(&mut self) {}
            }
        "#;
        let routes = scan_source(src, "api").unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].handler_method, "get_users");
        assert_eq!(routes[0].descriptor.method(), Method::Get);
        assert_eq!(routes[1].handler_method, "create_user");
        assert_eq!(routes[1].descriptor.method(), Method::Post);
        assert!(routes.iter().all(|r| r.handler_type == "Service" && r.package == "api"));
    }

    #[test]
    fn free_functions_have_no_owner() {
        let src = r#"
            /// @RestOperation( method = "GET", path = "/health" )
            fn health() {}
        "#;
        let routes = scan_source(src, "main").unwrap();
        assert_eq!(routes[0].handler_type, "");
        assert_eq!(routes[0].route_name(), "main..health");
    }

    #[test]
    fn value_and_reference_self_types_agree() {
        let src = r#"
            impl Handler {
                /// @RestOperation( method = "GET", path = "/a" )
                fn a(&self) {}
            }
            impl<'h> Named for &'h mut Handler {
                /// @RestOperation( method = "GET", path = "/b" )
                fn b(self) {}
            }
            impl crate::web::Handler<u8> {
                /// @RestOperation( method = "GET", path = "/c" )
                fn c(self: std::sync::Arc<Self>) {}
            }
        "#;
        let routes = scan_source(src, "p").unwrap();
        let owners: Vec<_> = routes.iter().map(|r| r.handler_type.as_str()).collect();
        assert_eq!(owners, ["Handler", "Handler", "Handler"]);
    }

    #[test]
    fn marker_mixed_with_prose() {
        let src = r#"
            impl Handler {
                /// Fetches one person by id.
                ///
                /// @RestOperation( method = "GET", path = "/person/{uid}", middlewares = ["Auth" "Logging"] )
                ///
                /// Returns 404 when unknown.
                fn get_person(&self) {}
            }
        "#;
        let routes = scan_source(src, "person").unwrap();
        assert_eq!(routes[0].descriptor.middlewares(), ["Auth", "Logging"]);
    }

    #[test]
    fn annotation_may_span_lines() {
        let src = r#"
            impl Handler {
                /// @RestOperation(
                ///     method = "PUT",
                ///     path = "/person/{uid}",
                ///     timeout = 5
                /// )
                fn put_person(&self) {}
            }
        "#;
        let routes = scan_source(src, "person").unwrap();
        assert_eq!(routes[0].descriptor.method(), Method::Put);
        assert_eq!(routes[0].descriptor.timeout_secs(), 5);
    }

    #[test]
    fn block_doc_comments_are_scanned() {
        let src = r#"
            /** @RestOperation( method = "DELETE", path = "/x" ) */
            fn remove() {}
        "#;
        let routes = scan_source(src, "p").unwrap();
        assert_eq!(routes[0].descriptor.method(), Method::Delete);
    }

    #[test]
    fn starred_block_comment_may_span_lines() {
        let src = "
            /**
             * Removes a person.
             * @RestOperation(
             *   method = \"DELETE\",
             *   path = \"/person/{uid}\",
             *   middlewares = [\"Auth\"]
             * )
             */
            fn remove() {}
        ";
        let routes = scan_source(src, "p").unwrap();
        assert_eq!(routes[0].descriptor.method(), Method::Delete);
        assert_eq!(routes[0].descriptor.path(), "/person/{uid}");
        assert_eq!(routes[0].descriptor.middlewares(), ["Auth"]);
    }

    #[test]
    fn only_first_marker_counts() {
        let src = r#"
            /// @RestOperation( method = "GET", path = "/first" )
            /// @RestOperation( method = "POST", path = "/second" )
            fn twice() {}
        "#;
        let routes = scan_source(src, "p").unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].descriptor.path(), "/first");
    }

    #[test]
    fn plain_comments_are_invisible() {
        let src = r#"
            // @RestOperation( method = "GET", path = "/hidden" )
            fn hidden() {}
        "#;
        assert!(scan_source(src, "p").unwrap().is_empty());
    }

    #[test]
    fn bad_annotation_aborts_the_scan() {
        let src = r#"
            impl Service {
                /// @RestOperation( method = "GET", path = "/ok" )
                fn fine(&self) {}

                /// @RestOperation( path = "/broken" )
                fn broken(&self) {}
            }
        "#;
        match scan_source(src, "p").unwrap_err() {
            ScanError::AnnotationParse { declaration, source } => {
                assert_eq!(declaration, "Service::broken");
                assert_eq!(source, ParseError::MissingMethod);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn syntax_errors_are_reported() {
        let err = scan_source("fn broken( {", "p").unwrap_err();
        assert!(matches!(err, ScanError::Syntax { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn module_names_follow_file_layout() {
        assert_eq!(module_name(Path::new("src/person.rs")), "person");
        assert_eq!(module_name(Path::new("src/person/mod.rs")), "person");
        assert_eq!(module_name(Path::new("src/lib.rs")), "crate");
    }
}
