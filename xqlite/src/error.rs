use std::ops::Range;

fn report(source_id: &str, src: &str, span: Range<usize>, message: String) -> anyhow::Result<()> {
    let red = ariadne::Color::Red;
    ariadne::Report::build(ariadne::ReportKind::Error, (source_id, span.clone()))
        .with_label(
            ariadne::Label::new((source_id, span))
                .with_message(message)
                .with_color(red),
        )
        .finish()
        .eprint((source_id, ariadne::Source::from(src)))?;
    Ok(())
}

/// Render a query error, with its span if it has one.
pub(crate) fn render_query_error(
    source_id: &str,
    src: &str,
    e: &xqlite_ast::Error,
) -> anyhow::Result<()> {
    match e.span() {
        Some(span) => report(source_id, src, span, e.to_string()),
        None => {
            eprintln!("{}", e);
            Ok(())
        }
    }
}

pub(crate) fn render_parse_error(
    source_id: &str,
    src: &str,
    e: &xot::ParseError,
) -> anyhow::Result<()> {
    report(source_id, src, e.span().range(), e.to_string())
}
