//! The Go toolchain: tree-sitter parsing plus in-process resolution.

pub mod index;
pub mod parser;
pub mod resolver;
pub mod typestr;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::toolchain::{ParseTree, Toolchain, TypeInfo};

use index::{index_package, package_clause, PackageIndex};
use parser::GoParser;
use resolver::Resolver;

pub use resolver::is_primitive_type;

pub struct GoToolchain {
    parser: GoParser,
}

impl GoToolchain {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: GoParser::new()?,
        })
    }
}

impl Toolchain for GoToolchain {
    fn parse(&mut self, path: &Path) -> Result<ParseTree> {
        self.parser.parse_file(path)
    }

    /// Resolve all files, grouped per `(directory, package name)`. A file
    /// without a package clause is reported and dropped from resolution;
    /// its parse tree still feeds structural extraction upstream.
    fn type_check(&mut self, files: &[&ParseTree]) -> Result<TypeInfo> {
        let mut groups: BTreeMap<(PathBuf, String), Vec<&ParseTree>> = BTreeMap::new();
        for &file in files {
            let Some((pkg_name, _)) = package_clause(file) else {
                eprintln!(
                    "Warning: {} has no package clause, skipping resolution",
                    file.path.display()
                );
                continue;
            };
            let dir = file.path.parent().unwrap_or(Path::new("")).to_path_buf();
            groups.entry((dir, pkg_name)).or_default().push(file);
        }

        // Package name → index; the lexicographically first directory wins
        // when two directories declare the same package name.
        let mut indexes: BTreeMap<String, PackageIndex> = BTreeMap::new();
        for ((dir, pkg_name), group) in &groups {
            if indexes.contains_key(pkg_name) {
                eprintln!(
                    "Warning: package {} declared in more than one directory, keeping {}",
                    pkg_name,
                    indexes[pkg_name].dir.display()
                );
                continue;
            }
            let index = index_package(pkg_name, dir.clone(), group);
            indexes.insert(pkg_name.clone(), index);
        }

        let mut info = TypeInfo::default();
        let resolver = Resolver::new(&indexes);
        for ((dir, pkg_name), group) in &groups {
            if indexes.get(pkg_name).map(|i| &i.dir) != Some(dir) {
                continue;
            }
            let mut group_info = TypeInfo::default();
            for file in group {
                resolver.resolve_file(file, pkg_name, &mut group_info);
            }
            info.merge(group_info);
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::{ObjectKind, SelectionKind};

    fn check(sources: &[(&str, &str)]) -> (Vec<ParseTree>, TypeInfo) {
        let mut toolchain = GoToolchain::new().unwrap();
        let trees: Vec<ParseTree> = sources
            .iter()
            .map(|(path, source)| {
                toolchain
                    .parser
                    .parse_source(source.to_string(), Path::new(path))
                    .unwrap()
            })
            .collect();
        let refs: Vec<&ParseTree> = trees.iter().collect();
        let info = toolchain.type_check(&refs).unwrap();
        (trees, info)
    }

    #[test]
    fn test_resolves_cross_package_type() {
        let (_, info) = check(&[
            (
                "/proj/handlers/calc.go",
                "package handlers\n\
                 \n\
                 import \"example.com/proj/models\"\n\
                 \n\
                 func Run(req models.Request) {}\n",
            ),
            (
                "/proj/models/types.go",
                "package models\n\
                 \n\
                 type Request struct {\n\
                 \tA int\n\
                 }\n",
            ),
        ]);

        // The `Request` type identifier on line 4 of calc.go.
        let use_site = (
            "file:///proj/handlers/calc.go".to_string(),
            4,
            20,
        );
        let object = info.uses.get(&use_site).expect("type use resolved");
        assert_eq!(object.kind, ObjectKind::TypeName);
        assert_eq!(object.package, "models");
        assert_eq!(object.decl.uri, "file:///proj/models/types.go");
        assert_eq!(object.decl.line, 2);
    }

    #[test]
    fn test_resolves_method_selection() {
        let (_, info) = check(&[(
            "/proj/calc.go",
            "package calc\n\
             \n\
             type Calculator struct{}\n\
             \n\
             func (c Calculator) Sum(a int) int { return a }\n\
             \n\
             func Use() int {\n\
             \tcalc := Calculator{}\n\
             \treturn calc.Sum(1)\n\
             }\n",
        )]);

        // `Sum` in `calc.Sum(1)` on line 8.
        let sel_site = ("file:///proj/calc.go".to_string(), 8, 13);
        let selection = info.selections.get(&sel_site).expect("selection recorded");
        assert_eq!(selection.kind, SelectionKind::MethodVal);
        assert_eq!(selection.object.receiver_type, "Calculator");
        assert_eq!(selection.object.decl.line, 4);
    }

    #[test]
    fn test_resolves_field_through_param() {
        let (_, info) = check(&[(
            "/proj/calc.go",
            "package calc\n\
             \n\
             type Req struct {\n\
             \tA int\n\
             }\n\
             \n\
             func Sum(req Req) int { return req.A }\n",
        )]);

        // `A` in `req.A` on line 6, column 35.
        let sel_site = ("file:///proj/calc.go".to_string(), 6, 35);
        let selection = info.selections.get(&sel_site).expect("field selection");
        assert_eq!(selection.kind, SelectionKind::Field);
        assert_eq!(selection.object.kind, ObjectKind::Field);
        assert_eq!(selection.object.type_string, "int");
    }

    #[test]
    fn test_unresolved_external_package_is_silent() {
        let (_, info) = check(&[(
            "/proj/main.go",
            "package main\n\
             \n\
             import \"net/http\"\n\
             \n\
             func main() {\n\
             \thttp.ListenAndServe(\":8080\", nil)\n\
             }\n",
        )]);

        // `ListenAndServe` stays unresolved: http is not part of the tree.
        let sel_site = ("file:///proj/main.go".to_string(), 5, 6);
        assert!(info.uses.get(&sel_site).is_none());
        assert!(info.selections.get(&sel_site).is_none());
    }

    #[test]
    fn test_local_inference_from_call_result() {
        let (_, info) = check(&[(
            "/proj/calc.go",
            "package calc\n\
             \n\
             type Out struct {\n\
             \tSum int\n\
             }\n\
             \n\
             func Make() Out { return Out{} }\n\
             \n\
             func Use() int {\n\
             \tout := Make()\n\
             \treturn out.Sum\n\
             }\n",
        )]);

        // `Sum` in `out.Sum` resolves through the result type of Make.
        let sel_site = ("file:///proj/calc.go".to_string(), 10, 12);
        let selection = info.selections.get(&sel_site).expect("field selection");
        assert_eq!(selection.object.name, "Sum");
        assert_eq!(selection.object.decl.line, 3);
    }
}
