use stxml::{Error, Namespaces, NodeKind, XPathEngine, XPathErrorCode, XPathOptions, XPathResult, XmlDocument};

const CATALOG: &str = r#"<catalog xmlns:bk="urn:books">
  <bk:book id="b1" xml:lang="en"><title>Rust</title><price>30</price></bk:book>
  <bk:book id="b2" xml:lang="en-GB"><title>XML</title><price>12.5</price></bk:book>
  <magazine id="m1"><title>Monthly</title><price>5</price></magazine>
  <!-- end -->
</catalog>"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn catalog() -> XmlDocument {
    init_tracing();
    XmlDocument::parse_str(CATALOG).unwrap()
}

fn strings(result: XPathResult<'_>) -> Vec<String> {
    result
        .into_nodeset()
        .unwrap()
        .into_iter()
        .map(|n| n.content().unwrap_or_default().into_owned())
        .collect()
}

fn code(doc: &XmlDocument, xpath: &str) -> XPathErrorCode {
    match doc.evaluate(xpath) {
        Err(Error::XPath(err)) => err.code,
        other => panic!("expected an XPath error for {}, got {:?}", xpath, other),
    }
}

#[test]
fn test_first_node_content() {
    init_tracing();
    let doc = XmlDocument::parse_str("<a><b/><c><d>e</d></c><f/></a>").unwrap();
    let nodes = doc.evaluate("//a/c/d").unwrap().into_nodeset().unwrap();
    assert_eq!(nodes.first().unwrap().content().unwrap(), "e");
}

#[test]
fn test_unprefixed_steps_match_local_names() {
    let doc = catalog();
    assert_eq!(strings(doc.evaluate("//book/title").unwrap()), ["Rust", "XML"]);
    assert_eq!(strings(doc.evaluate("/catalog/*/title").unwrap()), ["Rust", "XML", "Monthly"]);
}

#[test]
fn test_prefixed_steps() {
    let doc = catalog();
    let mut ns = Namespaces::new();
    ns.insert("b".to_string(), "urn:books".to_string());
    let found = doc.evaluate_with_namespaces("//b:book/@id", &ns).unwrap();
    assert_eq!(strings(found), ["b1", "b2"]);
    assert_eq!(doc.evaluate("count(//bk:*)").unwrap(), XPathResult::Number(2.0));
}

#[test]
fn test_scalar_results() {
    let doc = catalog();
    assert_eq!(doc.evaluate("sum(//price)").unwrap(), XPathResult::Number(47.5));
    assert_eq!(doc.evaluate("count(//title)").unwrap(), XPathResult::Number(3.0));
    assert_eq!(doc.evaluate("string(//magazine/@id)").unwrap(), XPathResult::String("m1".into()));
    assert_eq!(doc.evaluate("//price > 20").unwrap(), XPathResult::Boolean(true));
    assert_eq!(
        doc.evaluate("concat(name(//*[@id='b2']), '/', local-name(//*[@id='b2']))").unwrap(),
        XPathResult::String("bk:book/book".into())
    );
    assert_eq!(doc.evaluate("string(1 div 0)").unwrap().to_string_value(), "Infinity");
}

#[test]
fn test_predicates_and_functions() {
    let doc = catalog();
    assert_eq!(strings(doc.evaluate("//*[price < 15]/title").unwrap()), ["XML", "Monthly"]);
    assert_eq!(strings(doc.evaluate("//*[lang('en')]/title").unwrap()), ["Rust", "XML"]);
    assert_eq!(strings(doc.evaluate("//*[starts-with(title, 'M')]/@id").unwrap()), ["m1"]);
    assert_eq!(strings(doc.evaluate("//book[last()]/title").unwrap()), ["XML"]);
    assert_eq!(strings(doc.evaluate("//title[. = 'XML']/following::title").unwrap()), ["Monthly"]);
}

#[test]
fn test_node_kinds_in_results() {
    let doc = catalog();
    let comments = doc.evaluate("/catalog/comment()").unwrap().into_nodeset().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments.first().unwrap().kind(), NodeKind::Comment);
    assert_eq!(comments.first().unwrap().content().unwrap(), " end ");

    let texts = doc.evaluate("//title/text()").unwrap().into_nodeset().unwrap();
    assert!(texts.iter().all(|n| n.kind() == NodeKind::Text));
}

#[test]
fn test_results_in_document_order() {
    let doc = catalog();
    let nodes = doc.evaluate("//price | //title | //book").unwrap().into_nodeset().unwrap();
    let ids = nodes.ids().to_vec();
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(ids, sorted);
    assert_eq!(nodes.len(), 8);
}

#[test]
fn test_relative_to_node() {
    let doc = catalog();
    let magazine = doc.evaluate("//magazine").unwrap().into_nodeset().unwrap().first().unwrap();
    assert_eq!(strings(magazine.evaluate("title").unwrap()), ["Monthly"]);
    assert_eq!(magazine.evaluate("count(preceding-sibling::*)").unwrap(), XPathResult::Number(2.0));
    assert_eq!(magazine.evaluate("name(..)").unwrap(), XPathResult::String("catalog".into()));
}

#[test]
fn test_no_match_is_empty_nodeset() {
    let doc = catalog();
    let nodes = doc.evaluate("//missing/child").unwrap().into_nodeset().unwrap();
    assert!(nodes.is_empty());
    assert_eq!(doc.evaluate("namespace::*").unwrap().into_nodeset().map(|n| n.len()), Some(0));
}

#[test]
fn test_error_codes() {
    let doc = catalog();
    assert_eq!(code(&doc, "//title[text() = 'open"), XPathErrorCode::UnfinishedLiteral);
    assert_eq!(code(&doc, "//title[1"), XPathErrorCode::Unclosed);
    assert_eq!(code(&doc, "nonsense(//title)"), XPathErrorCode::UnknownFunction);
    assert_eq!(code(&doc, "count(//a, //b)"), XPathErrorCode::InvalidArity);
    assert_eq!(code(&doc, "//title # 2"), XPathErrorCode::InvalidChar);
    assert_eq!(code(&doc, "//title[$n]"), XPathErrorCode::UndefinedVariable);
    assert_eq!(code(&doc, "sum('3')"), XPathErrorCode::InvalidType);
    assert_eq!(code(&doc, "//title/"), XPathErrorCode::ExpressionError);

    let err = doc.evaluate("//[").unwrap_err();
    assert_eq!(err.kind(), stxml::ErrorKind::InvalidExpression);
    assert_eq!(err.code() >> 16, 12);
}

#[test]
fn test_deeply_nested_expression_is_an_error() {
    let doc = catalog();
    let depth = 10_000;
    let xpath = format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(code(&doc, &xpath), XPathErrorCode::ExpressionError);
    assert_eq!(doc.evaluate(&xpath).unwrap_err().kind(), stxml::ErrorKind::InvalidExpression);
}

#[test]
fn test_sum_of_empty_set_is_positive_zero() {
    let doc = catalog();
    assert_eq!(doc.evaluate("1 div sum(//missing)").unwrap(), XPathResult::Number(f64::INFINITY));
}

#[test]
fn test_engine_batch_evaluation() {
    let doc = catalog();
    let engine = XPathEngine::new(&XPathOptions { cache_capacity: 8 });
    let queries = ["count(//book)", "string(//book[1]/title)", "//price[. > 100]", "bogus("];
    let results = engine.evaluate_all(&doc, &queries);

    assert_eq!(results[0], Ok(XPathResult::Number(2.0)));
    assert_eq!(results[1], Ok(XPathResult::String("Rust".into())));
    assert!(results[2].as_ref().unwrap().as_nodeset().unwrap().is_empty());
    assert!(results[3].is_err());
    assert_eq!(engine.cached_len(), 3);

    // Second round is served from the cache
    let again = engine.evaluate_all(&doc, &queries[..3]);
    assert_eq!(again[..], results[..3]);
    assert_eq!(engine.cached_len(), 3);
}
