use crate::models::{AttrKey, Category, Citation, Entry, Sense};
use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("entry has an empty headword")]
    EmptyHeadword,
    #[error("entry has no pinyin")]
    MissingPinyin,
    #[error("rendered fragment is {0} bytes, larger than an index record can address")]
    Oversized(usize),
}

/// Escapes the characters reserved by HTML markup.
pub fn escape_html(text: &str) -> Cow<'_, str> {
    if !text.contains(['<', '>', '&']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

pub fn frequency_name(level: u32) -> Cow<'static, str> {
    match level {
        0 => Cow::Borrowed("最常用"),
        1 => Cow::Borrowed("较常用"),
        2 => Cow::Borrowed("次常用"),
        3 => Cow::Borrowed("二级字"),
        4 => Cow::Borrowed("三级字"),
        5 => Cow::Borrowed("生僻字"),
        n => Cow::Owned(format!("频率{}", n)),
    }
}

/// Renders an entry into its HTML content fragment.
///
/// Pure: identical entries always render to identical bytes.
pub fn render(entry: &Entry) -> Result<String, RenderError> {
    if entry.headword.is_empty() {
        return Err(RenderError::EmptyHeadword);
    }
    if entry.pinyin.is_empty() {
        return Err(RenderError::MissingPinyin);
    }

    let html = match entry.category {
        Category::Character => render_character(entry),
        Category::Word | Category::Idiom => render_word(entry),
    };

    if html.len() > u32::MAX as usize {
        return Err(RenderError::Oversized(html.len()));
    }
    Ok(html)
}

fn labeled(parts: &mut Vec<String>, label: &str, value: &str) {
    parts.push(format!("<p><b>{}</b> {}</p>", label, escape_html(value)));
}

fn labeled_list(parts: &mut Vec<String>, label: &str, values: Option<&[String]>) {
    if let Some(values) = values.filter(|v| !v.is_empty()) {
        let joined: Vec<Cow<'_, str>> = values.iter().map(|v| escape_html(v)).collect();
        parts.push(format!("<p><b>{}</b> {}</p>", label, joined.join("、")));
    }
}

fn citation_html(citation: &Citation) -> String {
    let mut html = format!("<p class=\"citation\">{}", escape_html(&citation.text));
    if !citation.book.is_empty() {
        html.push_str(&format!(" ——《{}》", escape_html(&citation.book)));
    }
    html.push_str("</p>");
    html
}

fn senses_html(senses: &[Sense]) -> String {
    let mut html = String::from("<div class=\"senses\">");
    for sense in senses {
        html.push_str("<div class=\"sense\">");
        if !sense.pinyin.is_empty() {
            html.push_str(&format!("<h4>{}</h4>", escape_html(&sense.pinyin)));
        }
        if !sense.glosses.is_empty() {
            html.push_str("<ol>");
            for gloss in &sense.glosses {
                html.push_str(&format!("<li>{}", escape_html(&gloss.content)));
                if let Some(example) = &gloss.example {
                    html.push_str(&format!(
                        "<p class=\"example\">例：{}</p>",
                        escape_html(example)
                    ));
                }
                for citation in &gloss.citations {
                    html.push_str(&citation_html(citation));
                }
                html.push_str("</li>");
            }
            html.push_str("</ol>");
        }
        html.push_str("</div>");
    }
    html.push_str("</div>");
    html
}

fn render_character(entry: &Entry) -> String {
    let attrs = &entry.attributes;
    let headword = escape_html(&entry.headword);
    let mut parts = vec![
        "<div class=\"character-entry\">".to_string(),
        format!("<h1 class=\"char\">{}</h1>", headword),
        format!("<p class=\"pinyin\">{}</p>", escape_html(&entry.pinyin.join(", "))),
    ];

    if let Some(strokes) = attrs.count(AttrKey::Strokes) {
        parts.push(format!("<p><b>笔画</b> {}</p>", strokes));
    }
    if let Some(radical) = attrs.text(AttrKey::Radical) {
        labeled(&mut parts, "部首", radical);
    }
    if let Some(structure) = attrs.text(AttrKey::Structure) {
        labeled(&mut parts, "结构", structure);
    }
    if let Some(level) = attrs.count(AttrKey::Frequency) {
        parts.push(format!("<p><b>频率</b> {}</p>", frequency_name(level)));
    }
    if let Some(traditional) = attrs.text(AttrKey::Traditional).filter(|t| *t != entry.headword) {
        labeled(&mut parts, "繁体", traditional);
    }
    if let Some(variant) = attrs.text(AttrKey::Variant).filter(|v| *v != entry.headword) {
        labeled(&mut parts, "异体", variant);
    }
    if let Some(explanation) = attrs.text(AttrKey::Explanation) {
        labeled(&mut parts, "解释", explanation);
    }
    if let Some(senses) = attrs.senses(AttrKey::Senses).filter(|s| !s.is_empty()) {
        parts.push(senses_html(senses));
    }
    labeled_list(&mut parts, "相关字", attrs.list(AttrKey::Related));
    labeled_list(&mut parts, "近义字", attrs.list(AttrKey::Synonyms));
    labeled_list(&mut parts, "反义字", attrs.list(AttrKey::Antonyms));
    labeled_list(&mut parts, "形近字", attrs.list(AttrKey::SimilarShape));

    parts.push("</div>".to_string());
    parts.join("\n")
}

fn render_word(entry: &Entry) -> String {
    let attrs = &entry.attributes;
    let class = match entry.category {
        Category::Idiom => "idiom-entry",
        _ => "word-entry",
    };
    let mut parts = vec![
        format!("<div class=\"{}\">", class),
        format!("<h1 class=\"word\">{}</h1>", escape_html(&entry.headword)),
        format!("<p class=\"pinyin\">{}</p>", escape_html(&entry.pinyin.join(", "))),
    ];

    if let Some(abbr) = attrs.text(AttrKey::Abbreviation) {
        labeled(&mut parts, "缩写", abbr);
    }
    if let Some(explanation) = attrs.text(AttrKey::Explanation) {
        labeled(&mut parts, "解释", explanation);
    }
    if let Some(source) = attrs.citation(AttrKey::Source) {
        parts.push(format!("<div class=\"source\"><b>出处</b>{}</div>", citation_html(source)));
    }
    if let Some(quote) = attrs.citation(AttrKey::Quote) {
        parts.push(format!("<div class=\"quote\"><b>引用</b>{}</div>", citation_html(quote)));
    }
    if let Some(story) = attrs.list(AttrKey::Story).filter(|s| !s.is_empty()) {
        let paragraphs: String = story
            .iter()
            .map(|p| format!("<p>{}</p>", escape_html(p)))
            .collect();
        parts.push(format!("<div class=\"story\"><b>典故</b>{}</div>", paragraphs));
    }
    labeled_list(&mut parts, "近义词", attrs.list(AttrKey::Synonyms));
    labeled_list(&mut parts, "反义词", attrs.list(AttrKey::Antonyms));
    if let Some(example) = attrs.text(AttrKey::Example) {
        labeled(&mut parts, "例句", example);
    }
    if let Some(usage) = attrs.text(AttrKey::Usage) {
        labeled(&mut parts, "用法", usage);
    }
    if let Some(notice) = attrs.text(AttrKey::Notice) {
        labeled(&mut parts, "注意", notice);
    }

    parts.push("</div>".to_string());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttrValue, Gloss};

    fn character() -> Entry {
        Entry::new(Category::Character, "一")
            .with_pinyin(["yī"])
            .with_attr(AttrKey::Strokes, AttrValue::Count(1))
            .with_attr(AttrKey::Radical, AttrValue::Text("一".into()))
            .with_attr(AttrKey::Frequency, AttrValue::Count(0))
    }

    #[test]
    fn escape_reserved_characters() {
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert!(matches!(escape_html("plain 文字"), Cow::Borrowed(_)));
    }

    #[test]
    fn character_layout() {
        let html = render(&character()).unwrap();
        assert!(html.starts_with("<div class=\"character-entry\">"));
        assert!(html.contains("<h1 class=\"char\">一</h1>"));
        assert!(html.contains("<b>笔画</b> 1"));
        assert!(html.contains("<b>部首</b> 一"));
        assert!(html.contains("最常用"));
        assert!(html.ends_with("</div>"));
    }

    #[test]
    fn missing_attributes_are_omitted() {
        let entry = Entry::new(Category::Character, "人").with_pinyin(["rén"]);
        let html = render(&entry).unwrap();
        assert!(!html.contains("笔画"));
        assert!(!html.contains("部首"));
        assert!(!html.contains("senses"));
        assert_eq!(html.lines().count(), 4);
    }

    #[test]
    fn free_text_is_escaped() {
        let entry = Entry::new(Category::Word, "大于")
            .with_pinyin(["dà yú"])
            .with_attr(AttrKey::Explanation, AttrValue::Text("a < b & c".into()))
            .with_attr(AttrKey::Example, AttrValue::Text("<script>".into()));
        let html = render(&entry).unwrap();
        assert!(html.contains("a &lt; b &amp; c"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn traditional_equal_to_headword_is_skipped() {
        let entry = character().with_attr(AttrKey::Traditional, AttrValue::Text("一".into()));
        assert!(!render(&entry).unwrap().contains("繁体"));
        let entry = Entry::new(Category::Character, "东")
            .with_pinyin(["dōng"])
            .with_attr(AttrKey::Traditional, AttrValue::Text("東".into()));
        assert!(render(&entry).unwrap().contains("<b>繁体</b> 東"));
    }

    #[test]
    fn senses_render_examples_and_citations() {
        let entry = character().with_attr(
            AttrKey::Senses,
            AttrValue::Senses(vec![Sense {
                pinyin: "yī".into(),
                glosses: vec![Gloss {
                    content: "数名".into(),
                    example: Some("一二".into()),
                    citations: vec![Citation {
                        text: "道生一".into(),
                        book: "老子".into(),
                    }],
                }],
            }]),
        );
        let html = render(&entry).unwrap();
        assert!(html.contains("<h4>yī</h4>"));
        assert!(html.contains("<li>数名"));
        assert!(html.contains("例：一二"));
        assert!(html.contains("道生一 ——《老子》"));
    }

    #[test]
    fn idiom_layout() {
        let entry = Entry::new(Category::Idiom, "一心一意")
            .with_pinyin(["yī xīn yī yì"])
            .with_attr(AttrKey::Abbreviation, AttrValue::Text("yxyy".into()))
            .with_attr(
                AttrKey::Synonyms,
                AttrValue::List(vec!["全心全意".into(), "专心致志".into()]),
            )
            .with_attr(AttrKey::Story, AttrValue::List(vec!["第一段".into()]));
        let html = render(&entry).unwrap();
        assert!(html.starts_with("<div class=\"idiom-entry\">"));
        assert!(html.contains("<b>缩写</b> yxyy"));
        assert!(html.contains("全心全意、专心致志"));
        assert!(html.contains("<p>第一段</p>"));
    }

    #[test]
    fn render_is_deterministic() {
        let entry = character();
        assert_eq!(render(&entry).unwrap(), render(&entry.clone()).unwrap());
    }

    #[test]
    fn missing_pinyin_fails() {
        let entry = Entry::new(Category::Character, "丂");
        assert_eq!(render(&entry), Err(RenderError::MissingPinyin));
        let entry = Entry::new(Category::Word, "").with_pinyin(["x"]);
        assert_eq!(render(&entry), Err(RenderError::EmptyHeadword));
    }

    #[test]
    fn frequency_names() {
        assert_eq!(frequency_name(5), "生僻字");
        assert_eq!(frequency_name(9), "频率9");
    }
}
