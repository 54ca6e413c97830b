//! "Application for Leave" form rendered from an archive row.

use anyhow::anyhow;
use genpdf::{Alignment, Element, elements, style};

use crate::{config::Config, error::AppResult, model::archive::LeaveArchive};

/// `(last, first, middle)`: first token, last token, and the second token when there are
/// three or more.
pub fn split_name(full_name: &str) -> (String, String, String) {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    let first = parts.first().copied().unwrap_or_default();
    let last = parts.last().copied().unwrap_or_default();
    let middle = if parts.len() > 2 { parts[1] } else { "" };
    (last.to_string(), first.to_string(), middle.to_string())
}

/// Human label of where the leave is spent.
pub fn where_spent(archive: &LeaveArchive) -> String {
    let location = archive
        .vacation_location
        .as_deref()
        .or(archive.sick_location.as_deref());

    match location {
        Some("philippines") => "Within the Philippines".into(),
        Some("abroad") => "Abroad".into(),
        Some("hospital") => "In Hospital".into(),
        Some("home") => "At Home".into(),
        Some(other) => other.to_string(),
        None => "N/A".into(),
    }
}

fn or_none(text: &str) -> String {
    if text.trim().is_empty() {
        "None".to_string()
    } else {
        text.to_string()
    }
}

/// Label/value pairs printed under "Details of Application" and "Details of Action".
pub fn form_sections(archive: &LeaveArchive) -> [(&'static str, Vec<(&'static str, String)>); 2] {
    let balance_after = archive
        .leave_balance_after
        .map_or_else(|| "N/A".to_string(), |d| format!("{d} day(s)"));

    [
        (
            "DETAILS OF APPLICATION",
            vec![
                ("Type of Leave", archive.leave_type.label().to_string()),
                ("Where Leave Will Be Spent", where_spent(archive)),
                ("Number of Working Days", archive.number_of_days.to_string()),
                ("Reason", or_none(&archive.reason)),
            ],
        ),
        (
            "DETAILS OF ACTION ON APPLICATION",
            vec![
                ("Leave Credits Year", archive.leave_balance_year.to_string()),
                ("Balance Before", format!("{} day(s)", archive.leave_balance_before)),
                ("Balance After", balance_after),
                ("Recommended By (Dean)", format!("{} ({})", archive.dean_name, archive.dean_department)),
                ("Dean Reviewed On", archive.dean_reviewed_at.format("%B %d, %Y").to_string()),
                ("Dean Comments", or_none(&archive.dean_comments)),
                ("Approved By (HR)", archive.hr_reviewer_name.clone()),
                ("HR Reviewed On", archive.hr_reviewed_at.format("%B %d, %Y").to_string()),
                ("HR Comments", or_none(&archive.hr_comments)),
                ("Final Status", archive.final_status.label().to_string()),
            ],
        ),
    ]
}

fn label_value_table(rows: &[(&'static str, String)]) -> AppResult<elements::TableLayout> {
    let mut table = elements::TableLayout::new(vec![2, 3]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    for (label, value) in rows {
        table
            .row()
            .element(elements::Paragraph::new(*label).styled(style::Style::new().bold()))
            .element(elements::Paragraph::new(value.as_str()))
            .push()
            .map_err(|e| anyhow!("PDF table row error: {e}"))?;
    }
    Ok(table)
}

pub fn render_archive_pdf(archive: &LeaveArchive, config: &Config) -> AppResult<Vec<u8>> {
    let font_family = genpdf::fonts::from_files(&config.pdf_font_dir, &config.pdf_font_name, None)
        .map_err(|e| anyhow!("Font '{}' not found in {}: {e}", config.pdf_font_name, config.pdf_font_dir))?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Leave Archive #{}", archive.id));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    let centered = |text: &str, style: style::Style| {
        let mut paragraph = elements::Paragraph::new(text);
        paragraph.set_alignment(Alignment::Center);
        paragraph.styled(style)
    };

    doc.push(centered(&config.institution_name, style::Style::new().bold().with_font_size(14)));
    doc.push(centered(&config.institution_address, style::Style::new().with_font_size(10)));
    doc.push(elements::Break::new(1.5));
    doc.push(centered("APPLICATION FOR LEAVE", style::Style::new().bold().with_font_size(16)));
    doc.push(elements::Break::new(1));

    let (last, first, middle) = split_name(&archive.employee_name);
    let mut names = elements::TableLayout::new(vec![1, 1, 1, 1]);
    names.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));
    let bold = style::Style::new().bold().with_font_size(9);
    names
        .row()
        .element(elements::Paragraph::new("Office / Department").styled(bold))
        .element(elements::Paragraph::new("Last Name").styled(bold))
        .element(elements::Paragraph::new("First Name").styled(bold))
        .element(elements::Paragraph::new("Middle Name").styled(bold))
        .push()
        .map_err(|e| anyhow!("PDF table row error: {e}"))?;
    names
        .row()
        .element(elements::Paragraph::new(archive.employee_department.as_str()))
        .element(elements::Paragraph::new(last))
        .element(elements::Paragraph::new(first))
        .element(elements::Paragraph::new(middle))
        .push()
        .map_err(|e| anyhow!("PDF table row error: {e}"))?;
    doc.push(names);
    doc.push(elements::Break::new(0.5));

    doc.push(label_value_table(&[
        ("Employee Code", archive.employee_code.clone()),
        ("Position", archive.employee_position.clone()),
        ("Date of Filing", archive.date_filed.format("%B %d, %Y").to_string()),
    ])?);

    for (title, rows) in form_sections(archive) {
        doc.push(elements::Break::new(1));
        doc.push(centered(title, style::Style::new().bold().with_font_size(11)));
        doc.push(label_value_table(&rows)?);
    }

    doc.push(elements::Break::new(1.5));
    let origin = if archive.archived_by_system { "system" } else { "manual" };
    doc.push(
        elements::Paragraph::new(format!(
            "Archived on {} ({origin})",
            archive.archived_at.format("%B %d, %Y %H:%M")
        ))
        .styled(style::Style::new().italic().with_font_size(8)),
    );

    let mut buffer = Vec::new();
    doc.render(&mut buffer)
        .map_err(|e| anyhow!("PDF render failed: {e}"))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{archive::FinalStatus, leave_application::LeaveType};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn archive() -> LeaveArchive {
        let at = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        LeaveArchive {
            id: 1,
            original_leave_request_id: 8,
            original_leave_application_id: 5,
            employee_code: "OC-20260001".into(),
            employee_name: "Maria Santos Cruz".into(),
            employee_department: "College of Nursing".into(),
            employee_position: "Instructor".into(),
            leave_type: LeaveType::Sick,
            number_of_days: 3,
            vacation_location: None,
            sick_location: Some("hospital".into()),
            reason: String::new(),
            date_filed: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            dean_name: "Dr. Ana Reyes".into(),
            dean_department: "College of Nursing".into(),
            dean_reviewed_at: at,
            dean_comments: String::new(),
            hr_reviewer_username: "hr.jane".into(),
            hr_reviewer_name: "Jane Dela Cruz".into(),
            hr_reviewed_at: at,
            hr_comments: "policy".into(),
            final_status: FinalStatus::Denied,
            leave_balance_before: 15,
            leave_balance_after: Some(15),
            leave_balance_year: 2026,
            archived_at: at,
            archived_by_system: true,
        }
    }

    #[test]
    fn splits_names_into_form_columns() {
        assert_eq!(
            split_name("Maria Santos Cruz"),
            ("Cruz".into(), "Maria".into(), "Santos".into())
        );
        assert_eq!(split_name("Maria Cruz"), ("Cruz".into(), "Maria".into(), String::new()));
        assert_eq!(split_name(""), (String::new(), String::new(), String::new()));
    }

    #[test]
    fn sections_carry_snapshots_and_labels() {
        let [application, action] = form_sections(&archive());

        assert!(application.1.contains(&("Where Leave Will Be Spent", "In Hospital".to_string())));
        assert!(application.1.contains(&("Reason", "None".to_string())));
        assert!(action.1.contains(&("Balance Before", "15 day(s)".to_string())));
        assert!(action.1.contains(&("Final Status", "Approved by Dean, Denied by HR".to_string())));
    }
}
