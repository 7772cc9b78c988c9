//! Draft assembler: recomputes length/tag counters and renders the
//! final Markdown artifact, metadata footer included.

use articlesmith_core::{ArticleType, Draft};

/// Render `draft` as the final Markdown artifact.
///
/// Recomputes `actual_length`/`tag_count` first so the footer always
/// reflects the text actually being rendered, then emits: title choices,
/// lead, sections (header + body), closing, and the fixed metadata footer.
#[must_use]
pub fn assemble(draft: &mut Draft) -> String {
    draft.recompute_derived_fields();
    render_markdown(draft)
}

/// Pure rendering step, assuming `draft`'s derived fields are already
/// current. Split out from [`assemble`] so tests can check the exact
/// footer shape against a fixed draft without mutating it.
#[must_use]
pub fn render_markdown(draft: &Draft) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", draft.titles[0]));
    out.push_str("候補タイトル:\n");
    for (i, title) in draft.titles.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, title));
    }
    out.push('\n');

    out.push_str(&draft.lead);
    out.push_str("\n\n");

    for section in &draft.sections {
        out.push_str(&section.heading);
        out.push('\n');
        out.push_str(&section.body);
        out.push_str("\n\n");
    }

    out.push_str(&draft.closing);
    out.push('\n');

    out.push_str(&render_footer(draft));
    out
}

fn render_footer(draft: &Draft) -> String {
    let consistency_pct = (draft.consistency_score * 100.0).round() as i64;
    let confidence_pct = (draft.verification_confidence * 100.0).round() as i64;
    format!(
        "\n---\n\n\
### メタ情報\n\
- 記事カテゴリ: {}\n\
- テーマ: {}\n\
- 総文字数: 約{}字（目標: {}字）\n\
- [要確認]タグ: {}箇所\n\
- 文体一貫性スコア: {}%\n\
- 事実検証信頼度: {}%\n\n\
### 次のステップ\n\
1. [要確認] タグがある箇所は事実確認してください\n\
2. タイトルは3案から選択または調整してください\n\
3. 必要に応じて文章を微調整してください\n",
        category_label(draft.category),
        draft.theme,
        draft.actual_length,
        draft.desired_length,
        draft.tag_count,
        consistency_pct,
        confidence_pct,
    )
}

fn category_label(category: ArticleType) -> &'static str {
    category.localized_label()
}
