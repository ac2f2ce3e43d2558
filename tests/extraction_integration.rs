//! End-to-end pipeline tests over the seed corpus in testdata/go-backend.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use gograph::graph::{edges, nodes, Graph, GraphBuilder};
use gograph::pipeline::discover_files;
use gograph::sast::builder::{collect_global_names, SastBuilder};
use gograph::sast::{persist, SastNode};
use gograph::symbols::{collector, is_primitive, SymbolTable};
use gograph::toolchain::go::GoToolchain;
use gograph::toolchain::{ParseTree, Toolchain};

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("testdata/go-backend")
        .canonicalize()
        .expect("fixture tree exists")
}

struct PipelineResult {
    graph: Graph,
    table: SymbolTable,
    sasts: BTreeMap<PathBuf, SastNode>,
}

fn run_pipeline(root: &Path) -> PipelineResult {
    let out_dir = tempfile::tempdir().unwrap();
    let intermediate = out_dir.path().join("intermediate_representation");

    let files = discover_files(root, out_dir.path()).unwrap();
    assert_eq!(files.len(), 4, "seed corpus has four source files");

    let mut toolchain = GoToolchain::new().unwrap();
    let trees: Vec<ParseTree> = files
        .iter()
        .map(|f| toolchain.parse(f).unwrap())
        .collect();
    let tree_refs: Vec<&ParseTree> = trees.iter().collect();
    let info = toolchain.type_check(&tree_refs).unwrap();

    let globals = collect_global_names(&tree_refs);
    let builder = SastBuilder::new(&info, &globals);
    for tree in &trees {
        let sast = builder.build(tree);
        persist::save_sast(&sast, root, &intermediate).unwrap();
    }

    let sasts = persist::load_sasts(&intermediate).unwrap();

    let mut table = SymbolTable::new();
    for sast in sasts.values() {
        table.merge(collector::collect(sast));
    }

    let mut graph_builder = GraphBuilder::new();
    nodes::emit_nodes(&mut graph_builder, root, &sasts, &table, out_dir.path()).unwrap();
    edges::emit_edges(&mut graph_builder, root, &sasts, &table, out_dir.path()).unwrap();

    PipelineResult {
        graph: graph_builder.into_graph(),
        table,
        sasts,
    }
}

fn node_id(graph: &Graph, simple_name: &str, label: &str) -> String {
    let matches: Vec<&str> = graph
        .elements
        .nodes
        .iter()
        .filter(|n| {
            n.data.properties.get("simpleName").map(|s| s.as_str()) == Some(simple_name)
                && n.data.labels.iter().any(|l| l == label)
        })
        .map(|n| n.data.id.as_str())
        .collect();
    assert_eq!(
        matches.len(),
        1,
        "expected exactly one {} node named {}, got {:?}",
        label,
        simple_name,
        matches
    );
    matches[0].to_string()
}

fn has_edge(graph: &Graph, source: &str, label: &str, target: &str) -> bool {
    graph
        .elements
        .edges
        .iter()
        .any(|e| e.data.source == source && e.data.label == label && e.data.target == target)
}

#[test]
fn s1_declaration_nodes() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    for type_name in ["Calculator", "CalculationRequest", "CalculationResult"] {
        let id = node_id(graph, type_name, "Type");
        let node = graph
            .elements
            .nodes
            .iter()
            .find(|n| n.data.id == id)
            .unwrap();
        assert_eq!(node.data.labels, vec!["Type"]);
    }

    for op_name in ["CalculateHandler", "CalculateSum"] {
        let id = node_id(graph, op_name, "Operation");
        let node = graph
            .elements
            .nodes
            .iter()
            .find(|n| n.data.id == id)
            .unwrap();
        assert_eq!(node.data.labels, vec!["Operation", "Type"]);
    }
}

#[test]
fn s2_encapsulation_edges() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    let calculator = node_id(graph, "Calculator", "Type");
    let sum_method = node_id(graph, "CalculateSum", "Operation");
    assert!(has_edge(graph, &calculator, "encapsulates", &sum_method));

    let request = node_id(graph, "CalculationRequest", "Type");
    let a = node_id(graph, "A", "Variable");
    let b = node_id(graph, "B", "Variable");
    assert!(has_edge(graph, &request, "encapsulates", &a));
    assert!(has_edge(graph, &request, "encapsulates", &b));

    let response = node_id(graph, "CalculationResult", "Type");
    let sum_field = node_id(graph, "Sum", "Variable");
    assert!(has_edge(graph, &response, "encapsulates", &sum_field));
}

#[test]
fn s3_parameterization_and_typing() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    let req = node_id(graph, "req", "Variable");
    let sum_method = node_id(graph, "CalculateSum", "Operation");
    let request = node_id(graph, "CalculationRequest", "Type");

    assert!(has_edge(graph, &req, "parameterizes", &sum_method));
    assert!(has_edge(graph, &req, "typed", &request));
}

#[test]
fn s4_return_edge() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    let sum_method = node_id(graph, "CalculateSum", "Operation");
    let response = node_id(graph, "CalculationResult", "Type");
    assert!(has_edge(graph, &sum_method, "returns", &response));
}

#[test]
fn s5_requires_edge() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    let calculator_file = node_id(graph, "calculator.go", "File");
    let types_file = node_id(graph, "types.go", "File");
    assert!(has_edge(graph, &calculator_file, "requires", &types_file));

    // main.go imports handlers, which two files declare.
    let main_file = node_id(graph, "main.go", "File");
    let greetings_file = node_id(graph, "greetings.go", "File");
    assert!(has_edge(graph, &main_file, "requires", &calculator_file));
    assert!(has_edge(graph, &main_file, "requires", &greetings_file));
}

#[test]
fn s6_one_scope_per_package() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    let scopes: Vec<&str> = graph
        .elements
        .nodes
        .iter()
        .filter(|n| n.data.labels.iter().any(|l| l == "Scope"))
        .map(|n| n.data.id.as_str())
        .collect();
    // main, handlers, models.
    assert_eq!(scopes.len(), 3);
    let distinct: BTreeSet<&str> = scopes.iter().copied().collect();
    assert_eq!(distinct.len(), 3);

    let handlers_scope = node_id(graph, "handlers", "Scope");
    let models_scope = node_id(graph, "models", "Scope");
    let calculator = node_id(graph, "Calculator", "Type");
    let request = node_id(graph, "CalculationRequest", "Type");
    let response = node_id(graph, "CalculationResult", "Type");

    assert!(has_edge(graph, &handlers_scope, "encloses", &calculator));
    assert!(has_edge(graph, &models_scope, "encloses", &request));
    assert!(has_edge(graph, &models_scope, "encloses", &response));
}

#[test]
fn invokes_cross_file_calls() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    let handler = node_id(graph, "CalculateHandler", "Operation");
    let sum_method = node_id(graph, "CalculateSum", "Operation");
    assert!(has_edge(graph, &handler, "invokes", &sum_method));

    let main_fn = node_id(graph, "main", "Operation");
    let say_hello = node_id(graph, "SayHello", "Operation");
    assert!(has_edge(graph, &main_fn, "invokes", &handler));
    assert!(has_edge(graph, &main_fn, "invokes", &say_hello));
}

#[test]
fn uses_edges_reach_fields_and_params() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    let sum_method = node_id(graph, "CalculateSum", "Operation");
    let a = node_id(graph, "A", "Variable");
    let b = node_id(graph, "B", "Variable");
    let req = node_id(graph, "req", "Variable");
    assert!(has_edge(graph, &sum_method, "uses", &a));
    assert!(has_edge(graph, &sum_method, "uses", &b));
    assert!(has_edge(graph, &sum_method, "uses", &req));
}

#[test]
fn invariant_deterministic_ids() {
    let root = fixture_root();
    let first = run_pipeline(&root);
    let second = run_pipeline(&root);

    let first_nodes: BTreeSet<String> = first
        .graph
        .elements
        .nodes
        .iter()
        .map(|n| n.data.id.clone())
        .collect();
    let second_nodes: BTreeSet<String> = second
        .graph
        .elements
        .nodes
        .iter()
        .map(|n| n.data.id.clone())
        .collect();
    assert_eq!(first_nodes, second_nodes);

    let triples = |graph: &Graph| -> BTreeSet<(String, String, String)> {
        graph
            .elements
            .edges
            .iter()
            .map(|e| {
                (
                    e.data.source.clone(),
                    e.data.label.clone(),
                    e.data.target.clone(),
                )
            })
            .collect()
    };
    assert_eq!(triples(&first.graph), triples(&second.graph));
}

#[test]
fn invariant_round_trip_persistence() {
    let result = run_pipeline(&fixture_root());
    for sast in result.sasts.values() {
        let json = serde_json::to_string(sast).unwrap();
        let reread: SastNode = serde_json::from_str(&json).unwrap();
        assert_eq!(&reread, sast);
    }
}

#[test]
fn invariant_kind_label_mapping() {
    let result = run_pipeline(&fixture_root());
    for node in &result.graph.elements.nodes {
        let Some(kind) = node.data.properties.get("kind") else {
            continue;
        };
        let expected: Vec<String> = match kind.as_str() {
            "field" | "var" | "param" => vec!["Variable".to_string()],
            "func" | "method" => vec!["Operation".to_string(), "Type".to_string()],
            "type" | "struct" | "interface" => vec!["Type".to_string()],
            _ => continue,
        };
        assert_eq!(
            node.data.labels, expected,
            "bad labels for {} ({})",
            node.data.id, kind
        );
    }
}

#[test]
fn invariant_edge_well_formedness() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;
    let node_ids: BTreeSet<&str> = graph
        .elements
        .nodes
        .iter()
        .map(|n| n.data.id.as_str())
        .collect();

    for edge in &graph.elements.edges {
        assert!(
            node_ids.contains(edge.data.source.as_str()),
            "dangling source in {}",
            edge.data.id
        );
        // Uses edges may target function-local variables, which have no
        // nodes; every other label must be fully anchored.
        if edge.data.label != "uses" {
            assert!(
                node_ids.contains(edge.data.target.as_str()),
                "dangling target in {}",
                edge.data.id
            );
        }
    }
}

#[test]
fn invariant_no_primitive_nodes() {
    let result = run_pipeline(&fixture_root());
    for node in &result.graph.elements.nodes {
        let Some(kind) = node.data.properties.get("kind") else {
            continue;
        };
        if matches!(
            kind.as_str(),
            "field" | "var" | "param" | "func" | "method" | "type" | "struct" | "interface"
        ) {
            let name = node.data.properties.get("simpleName").unwrap();
            assert!(!is_primitive(name), "primitive node {} leaked", node.data.id);
        }
    }
}

#[test]
fn invariant_file_declares_coverage() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    for (key, info) in result.table.iter() {
        let top_level = matches!(
            info.kind.as_str(),
            "func" | "type" | "struct" | "interface" | "var"
        );
        if !top_level || is_primitive(&info.name) {
            continue;
        }
        let id = gograph::graph::to_node_id(key);
        let incoming: Vec<&str> = graph
            .elements
            .edges
            .iter()
            .filter(|e| e.data.label == "declares" && e.data.target == id)
            .map(|e| e.data.source.as_str())
            .collect();
        assert_eq!(
            incoming.len(),
            1,
            "expected one declares edge into {} ({})",
            info.name,
            key
        );
    }
}

#[test]
fn invariant_method_receiver_encapsulation() {
    let result = run_pipeline(&fixture_root());
    let graph = &result.graph;

    for (key, info) in result.table.iter() {
        if info.kind != "method" || info.receiver_type.is_empty() {
            continue;
        }
        if result
            .table
            .find_named(&info.receiver_type, &["struct", "interface"])
            .is_none()
        {
            continue;
        }
        let id = gograph::graph::to_node_id(key);
        let incoming = graph
            .elements
            .edges
            .iter()
            .filter(|e| e.data.label == "encapsulates" && e.data.target == id)
            .count();
        assert_eq!(incoming, 1, "expected one encapsulates edge into {}", info.name);
    }
}

#[test]
fn project_and_containment_edges() {
    let root = fixture_root();
    let result = run_pipeline(&root);
    let graph = &result.graph;

    let root_str = root.to_string_lossy().replace('\\', "/");
    let project_id = format!("project:{}", gograph::graph::to_node_id(&root_str));
    assert!(graph.elements.nodes.iter().any(|n| n.data.id == project_id));

    // Folders directly under the root are included but not contained.
    let handlers_folder = node_id(graph, "handlers", "Folder");
    assert!(has_edge(graph, &project_id, "includes", &handlers_folder));
    assert!(!graph
        .elements
        .edges
        .iter()
        .any(|e| e.data.label == "contains" && e.data.target == handlers_folder));

    // Files inside a folder are contained by it.
    let calculator_file = node_id(graph, "calculator.go", "File");
    assert!(has_edge(graph, &handlers_folder, "contains", &calculator_file));
    assert!(has_edge(graph, &project_id, "includes", &calculator_file));
}

#[test]
fn debug_symbol_table_dump_lists_positions() {
    let result = run_pipeline(&fixture_root());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("symbol_table.txt");
    result.table.write_text(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let position_lines = content
        .lines()
        .filter(|l| l.starts_with("Position: "))
        .count();
    assert_eq!(position_lines, result.table.len());
    assert!(content.contains("Name: CalculateSum"));
    assert!(content.contains("Receiver: Calculator"));
}
