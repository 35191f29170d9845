// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Option-list pagination for channels with a bounded row count.
//!
//! Questions whose option list exceeds the row ceiling are shown a page at a
//! time, with a trailing "more" sentinel row carrying a `MORE:<qid>:<page>`
//! token. The current page index per question lives in the session notes and
//! is cleared the moment the question is answered.

use formflow_core::types::{ChoiceOption, Question, Session};

/// Prefix of the pagination sentinel token.
pub const MORE_TOKEN_PREFIX: &str = "MORE:";

/// One visible page of a long option list.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedOptions {
    pub options: Vec<ChoiceOption>,
    pub page: usize,
    /// Index of the first option on this page within the full list, used for
    /// stable row numbering across pages.
    pub offset: usize,
    /// Token for the sentinel row, present while later pages remain.
    pub more_token: Option<String>,
}

/// A parsed `MORE:<qid>:<page>` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoreToken {
    pub qid: String,
    pub page: usize,
}

pub fn more_token(qid: &str, page: usize) -> String {
    format!("{MORE_TOKEN_PREFIX}{qid}:{page}")
}

/// Parse a pagination token. Anything malformed is `None`, so ordinary
/// answers that happen to start with "MORE" are unaffected.
pub fn parse_more_token(text: &str) -> Option<MoreToken> {
    let rest = text.trim().strip_prefix(MORE_TOKEN_PREFIX)?;
    let (qid, page) = rest.rsplit_once(':')?;
    if qid.is_empty() {
        return None;
    }
    Some(MoreToken {
        qid: qid.to_string(),
        page: page.parse().ok()?,
    })
}

/// Slice the page of options the session should currently see.
///
/// Returns `None` when the full list fits within `max_rows` and no paging is
/// needed. A stored page index past the end of the list resets to page zero.
pub fn page_options(
    question: &Question,
    session: &Session,
    max_rows: usize,
    page_size: usize,
) -> Option<PagedOptions> {
    if question.options.len() <= max_rows {
        return None;
    }
    let total_pages = question.options.len().div_ceil(page_size);
    let mut page = session
        .notes
        .option_pages
        .get(&question.qid)
        .copied()
        .unwrap_or(0);
    if page >= total_pages {
        page = 0;
    }
    let start = page * page_size;
    let end = (start + page_size).min(question.options.len());
    let more = if end < question.options.len() {
        Some(more_token(&question.qid, page + 1))
    } else {
        None
    };
    Some(PagedOptions {
        options: question.options[start..end].to_vec(),
        page,
        offset: start,
        more_token: more,
    })
}

/// Drop the stored page index for an answered question.
pub fn clear_page(session: &mut Session, qid: &str) {
    session.notes.option_pages.remove(qid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_core::types::{QuestionType, SessionKey};

    fn question(option_count: usize) -> Question {
        let mut q = Question::new("city", "Which city?", QuestionType::Dropdown);
        q.options = (0..option_count)
            .map(|i| ChoiceOption::new(format!("Option {i}"), format!("{i}")))
            .collect();
        q
    }

    fn session() -> Session {
        Session::new(SessionKey::new("u1", "intake"), None, "test")
    }

    #[test]
    fn short_lists_are_not_paged() {
        assert!(page_options(&question(10), &session(), 10, 9).is_none());
    }

    #[test]
    fn first_page_carries_more_token() {
        let q = question(25);
        let paged = page_options(&q, &session(), 10, 9).unwrap();
        assert_eq!(paged.page, 0);
        assert_eq!(paged.options.len(), 9);
        assert_eq!(paged.options[0].label, "Option 0");
        assert_eq!(paged.more_token.as_deref(), Some("MORE:city:1"));
    }

    #[test]
    fn last_page_is_short_and_final() {
        let q = question(25);
        let mut s = session();
        s.notes.option_pages.insert("city".to_string(), 2);
        let paged = page_options(&q, &s, 10, 9).unwrap();
        assert_eq!(paged.page, 2);
        assert_eq!(paged.options.len(), 7);
        assert!(paged.more_token.is_none());
    }

    #[test]
    fn out_of_range_page_resets_to_zero() {
        let q = question(25);
        let mut s = session();
        s.notes.option_pages.insert("city".to_string(), 99);
        let paged = page_options(&q, &s, 10, 9).unwrap();
        assert_eq!(paged.page, 0);
    }

    #[test]
    fn token_round_trip_and_rejection() {
        let token = more_token("city", 2);
        assert_eq!(
            parse_more_token(&token),
            Some(MoreToken {
                qid: "city".to_string(),
                page: 2
            })
        );
        // qids may themselves contain colons; the page is the last segment.
        assert_eq!(
            parse_more_token("MORE:a:b:3"),
            Some(MoreToken {
                qid: "a:b".to_string(),
                page: 3
            })
        );
        assert!(parse_more_token("MORE:city:x").is_none());
        assert!(parse_more_token("MORE:").is_none());
        assert!(parse_more_token("More please").is_none());
    }
}
