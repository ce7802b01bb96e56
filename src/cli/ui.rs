//! Plain-text rendering of the wizard view

use crate::wizard::{OptionList, WizardStep, WizardView};
use std::fmt::Write;

/// How many options to preview per list
const OPTION_PREVIEW: usize = 8;

fn preview(values: &[String]) -> String {
    // First entry is the placeholder label
    let real: Vec<&str> = values.iter().skip(1).map(String::as_str).collect();
    if real.is_empty() {
        return "none loaded".to_string();
    }
    let shown = real.iter().take(OPTION_PREVIEW).copied().collect::<Vec<_>>().join(", ");
    if real.len() > OPTION_PREVIEW {
        format!("{}, ... ({} total)", shown, real.len())
    } else {
        shown
    }
}

pub fn render_view(view: &WizardView) -> String {
    let mut out = String::new();
    let title = match view.step {
        WizardStep::Vehicle => "Vehicle",
        WizardStep::Contact => "Contact",
    };
    let _ = writeln!(out, "[Step {} of 2: {}]", view.step.number(), title);

    for field in view.step.required_fields() {
        let value = view.fields.get(*field);
        let shown = if value.is_empty() { "-" } else { value };
        let _ = write!(out, "  {:<6} {}", field.wire_name(), shown);

        if let Some(list) = OptionList::for_field(*field) {
            let _ = write!(out, "   ({}: {})", list, preview(view.options.get(list)));
        }
        out.push('\n');
    }

    if view.busy {
        out.push_str("  ... loading options\n");
    }
    if let Some(error) = &view.error {
        let _ = writeln!(out, "  ! {}", error);
    }
    let _ = write!(out, "  [{}]", view.button_label);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{FormFields, OptionSet};

    fn view() -> WizardView {
        WizardView {
            step: WizardStep::Vehicle,
            fields: FormFields {
                year: "2020".to_string(),
                ..FormFields::default()
            },
            options: OptionSet {
                years: vec!["Select Years".to_string(), "2020".to_string(), "2019".to_string()],
                makes: Vec::new(),
                models: Vec::new(),
            },
            busy: true,
            submitting: false,
            error: Some("Please fill in all required fields: make".to_string()),
            button_label: "Loading...",
        }
    }

    #[test]
    fn test_render_vehicle_step() {
        let text = render_view(&view());
        assert!(text.starts_with("[Step 1 of 2: Vehicle]"));
        assert!(text.contains("(years: 2020, 2019)"));
        assert!(text.contains("(makes: none loaded)"));
        assert!(text.contains("state  AL"));
        assert!(text.contains("! Please fill in all required fields: make"));
        assert!(text.ends_with("[Loading...]"));
        assert!(!text.contains("Select Years"));
    }

    #[test]
    fn test_preview_truncates() {
        let mut values = vec!["Select Makes".to_string()];
        values.extend((0..20).map(|i| format!("M{}", i)));
        let text = preview(&values);
        assert!(text.ends_with("... (20 total)"));
        assert!(text.starts_with("M0, M1"));
    }
}
