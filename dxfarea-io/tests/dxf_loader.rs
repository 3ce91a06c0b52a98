use std::io::Write;
use std::path::PathBuf;

use dxfarea_core::{
    document::{Entity, bounds},
    geometry::Point2,
};
use dxfarea_io::{DocumentLoader, DxfFacade, IoError, ParseError, parse};
use serde_json::json;

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn single_line_sample_parses_to_one_line() {
    let text = "ENTITIES\nLINE\n10\n0.0\n20\n0.0\n11\n5.0\n21\n5.0\n8\nLAYER1\n0\nENDSEC\n";
    let doc = parse(text).expect("解析示例 LINE 失败");
    assert_eq!(doc.entity_count(), 1);
    assert_eq!(doc.block_count(), 0);
    match &doc.entities()[0] {
        Entity::Line(line) => {
            assert_eq!(line.start, Point2::new(0.0, 0.0));
            assert_eq!(line.end, Point2::new(5.0, 5.0));
            assert_eq!(line.layer, "LAYER1");
            assert!(line.color.is_none());
            assert!(line.line_type.is_none());
        }
        other => panic!("expected LINE, got {other:?}"),
    }
}

#[test]
fn text_without_keywords_reports_no_entities() {
    assert_eq!(parse("hello\nworld\n1\n2\n"), Err(ParseError::NoEntities));
    assert_eq!(parse(""), Err(ParseError::NoEntities));
    // 有段标记但没有实体同样视为失败
    assert_eq!(
        parse("0\nSECTION\n2\nENTITIES\n0\nENDSEC\n0\nEOF\n"),
        Err(ParseError::NoEntities)
    );
}

#[test]
fn entities_outside_sections_are_ignored() {
    let text = "LINE\n10\n1\n20\n1\n0\nENTITIES\nCIRCLE\n40\n2\n0\nENDSEC\n";
    let doc = parse(text).expect("parse");
    assert_eq!(doc.entity_count(), 1);
    assert!(matches!(doc.entities()[0], Entity::Circle(_)));
}

#[test]
fn polyline_collects_vertices_in_order() {
    let text = "ENTITIES\nPOLYLINE\n8\nP\n0\nVERTEX\n10\n1\n20\n2\n0\nVERTEX\n10\n3\n20\n4\n0\nVERTEX\n10\n5\n20\n6\n0\nSEQEND\n0\nENDSEC\n";
    let doc = parse(text).expect("parse");
    assert_eq!(doc.entity_count(), 1);
    match &doc.entities()[0] {
        Entity::Polyline(polyline) => {
            assert_eq!(polyline.layer, "P");
            assert_eq!(
                polyline.vertices,
                vec![
                    Point2::new(1.0, 2.0),
                    Point2::new(3.0, 4.0),
                    Point2::new(5.0, 6.0)
                ]
            );
        }
        other => panic!("expected POLYLINE, got {other:?}"),
    }
}

#[test]
fn polyline_without_seqend_runs_to_end_of_input() {
    let text = "ENTITIES\nPOLYLINE\n0\nVERTEX\n10\n1\n20\n1\n0\nVERTEX\n10\n2\n20\n2";
    let doc = parse(text).expect("parse");
    match &doc.entities()[0] {
        Entity::Polyline(polyline) => assert_eq!(polyline.vertices.len(), 2),
        other => panic!("expected POLYLINE, got {other:?}"),
    }
}

#[test]
fn unterminated_record_keeps_collected_fields() {
    let doc = parse("ENTITIES\nCIRCLE\n10\n4\n20\n-2\n40\n1.5").expect("parse");
    match &doc.entities()[0] {
        Entity::Circle(circle) => {
            assert_eq!(circle.center, Point2::new(4.0, -2.0));
            assert_eq!(circle.radius, 1.5);
            assert_eq!(circle.layer, "0");
        }
        other => panic!("expected CIRCLE, got {other:?}"),
    }
}

#[test]
fn malformed_numbers_become_nan_and_do_not_abort() {
    let text = "ENTITIES\nLINE\n10\nabc\n20\n1\n11\n2\n21\n3\n62\nred\n0\nTEXT\n1\nok\n0\nENDSEC\n";
    let doc = parse(text).expect("parse");
    assert_eq!(doc.entity_count(), 2);
    match &doc.entities()[0] {
        Entity::Line(line) => {
            assert!(line.start.x().is_nan());
            assert_eq!(line.start.y(), 1.0);
            assert!(line.color.is_none());
        }
        other => panic!("expected LINE, got {other:?}"),
    }
    match &doc.entities()[1] {
        Entity::Text(text) => {
            assert_eq!(text.text, "ok");
            assert_eq!(text.height, 1.0);
            assert_eq!(text.rotation, 0.0);
        }
        other => panic!("expected TEXT, got {other:?}"),
    }
    // NaN 点不参与范围计算
    let bounds = bounds(doc.entities());
    assert!(bounds.is_finite());
    assert_eq!(bounds.min(), Point2::new(0.0, 0.0));
}

#[test]
fn basic_fixture_preserves_file_order_and_fields() {
    let doc = DxfFacade::new()
        .load(&fixture("basic_entities.dxf"))
        .expect("读取 basic_entities.dxf 失败");
    let kinds: Vec<&str> = doc.entities().iter().map(Entity::kind_name).collect();
    assert_eq!(
        kinds,
        vec!["LINE", "CIRCLE", "TEXT", "MTEXT", "POLYLINE", "INSERT"]
    );

    match &doc.entities()[0] {
        Entity::Line(line) => {
            assert_eq!(line.layer, "WALLS");
            assert_eq!(line.color, Some(1));
            assert_eq!(line.line_type.as_deref(), Some("CONTINUOUS"));
            assert_eq!(line.line_weight, Some(50));
            assert_eq!(line.end, Point2::new(100.0, 0.0));
        }
        other => panic!("expected LINE, got {other:?}"),
    }
    match &doc.entities()[2] {
        Entity::Text(text) => {
            assert_eq!(text.text, "Room 101");
            assert_eq!(text.height, 2.5);
            assert_eq!(text.rotation, 90.0);
        }
        other => panic!("expected TEXT, got {other:?}"),
    }
    match &doc.entities()[3] {
        Entity::MText(text) => assert_eq!(text.text, "Notes"),
        other => panic!("expected MTEXT, got {other:?}"),
    }
    match &doc.entities()[4] {
        Entity::Polyline(polyline) => {
            assert_eq!(polyline.color, Some(5));
            assert_eq!(polyline.vertices.len(), 3);
            assert_eq!(polyline.vertices[2], Point2::new(25.0, 5.0));
        }
        other => panic!("expected POLYLINE, got {other:?}"),
    }
    match &doc.entities()[5] {
        Entity::Insert(insert) => {
            assert_eq!(insert.block_name, "DOOR");
            assert_eq!(insert.layer, "SYMBOLS");
            assert_eq!(insert.insertion_point, Point2::new(30.0, -5.0));
            assert_eq!((insert.scale_x, insert.scale_y, insert.scale_z), (2.0, 2.0, 1.0));
            assert_eq!(insert.rotation_angle, 45.0);
        }
        other => panic!("expected INSERT, got {other:?}"),
    }

    let bounds = doc.bounds();
    assert_eq!(bounds.min(), Point2::new(0.0, 0.0));
    assert!((bounds.max().x() - 100.0).abs() < 1e-9);
    assert!((bounds.max().y() - 43.0).abs() < 1e-9);
}

#[test]
fn block_fixture_collects_definitions() {
    let doc = DxfFacade::new()
        .load(&fixture("blocks.dxf"))
        .expect("读取 blocks.dxf 失败");
    assert_eq!(doc.block_count(), 2);
    let door = doc.block("DOOR").expect("缺少 DOOR 块");
    let kinds: Vec<&str> = door.entities.iter().map(Entity::kind_name).collect();
    // 块内的 INSERT 不解析
    assert_eq!(kinds, vec!["LINE", "CIRCLE"]);
    assert!(doc.block("*MODEL_SPACE").is_some());

    assert_eq!(doc.entity_count(), 3);
    match &doc.entities()[1] {
        Entity::Insert(insert) => {
            // 未知块名在解析阶段不是错误
            assert_eq!(insert.block_name, "MISSING");
            assert!(doc.block(&insert.block_name).is_none());
        }
        other => panic!("expected INSERT, got {other:?}"),
    }
}

#[test]
fn parsing_twice_yields_equal_documents() {
    let text = std::fs::read_to_string(fixture("blocks.dxf")).expect("read fixture");
    let first = parse(&text).expect("first parse");
    let second = parse(&text).expect("second parse");
    assert_eq!(first, second);
}

#[test]
fn duplicate_block_names_keep_the_last_definition() {
    let text = "BLOCKS\nBLOCK\n2\nA\n0\nLINE\n0\nENDBLK\nBLOCK\n2\nA\n0\nCIRCLE\n0\nCIRCLE\n0\nENDBLK\nENDSEC\nENTITIES\nINSERT\n2\nA\n0\nENDSEC\n";
    let doc = parse(text).expect("parse");
    let block = doc.block("A").expect("block A");
    assert_eq!(block.entities.len(), 2);
}

#[test]
fn serialized_document_matches_snapshot() {
    let text = "ENTITIES\nCIRCLE\n8\nC\n10\n1\n20\n2\n40\n3\n62\n4\n0\nINSERT\n2\nB\n0\nENDSEC\n";
    let doc = parse(text).expect("parse");
    let value = serde_json::to_value(&doc).expect("serialize");
    assert_eq!(
        value,
        json!({
            "entities": [
                {"Circle": {
                    "center": [1.0, 2.0],
                    "radius": 3.0,
                    "layer": "C",
                    "color": 4,
                    "line_type": null,
                    "line_weight": null
                }},
                {"Insert": {
                    "block_name": "B",
                    "insertion_point": [0.0, 0.0],
                    "scale_x": 1.0,
                    "scale_y": 1.0,
                    "scale_z": 1.0,
                    "rotation_angle": 0.0,
                    "layer": "0",
                    "color": null
                }}
            ],
            "blocks": {}
        })
    );
}

#[test]
fn loader_reports_missing_file_and_empty_content() {
    let loader = DxfFacade::new();
    let missing = loader.load(&fixture("does_not_exist.dxf"));
    assert!(matches!(missing, Err(IoError::ReadError { .. })));

    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    writeln!(file, "0\nSECTION\n2\nHEADER\n0\nENDSEC\n0\nEOF").expect("write temp file");
    let empty = loader.load(file.path());
    assert!(matches!(
        empty,
        Err(IoError::ParseError {
            source: ParseError::NoEntities,
            ..
        })
    ));
}
