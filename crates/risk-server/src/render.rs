//! HTML input form and result page

use risk_lib::{ResultSet, Subject};
use std::fmt::Write;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n    <title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape(title),
        body
    )
}

/// Input form with one numeric field per schema feature
pub fn form(features: &[String]) -> String {
    let mut body = String::from(
        "    <h2>Enter Your Info</h2>\n    <form method=\"post\">\n        \
         <label>Name:</label><br>\n        <input type=\"text\" name=\"name\" required><br><br>\n\n        \
         <label>Age:</label><br>\n        <input type=\"number\" name=\"age\" required><br><br>\n\n",
    );

    for feature in features {
        let feature = escape(feature);
        let _ = write!(
            body,
            "        <label>{feature}:</label><br>\n        \
             <input type=\"number\" step=\"any\" name=\"{feature}\" required><br><br>\n\n"
        );
    }

    body.push_str("        <input type=\"submit\" value=\"Predict\">\n    </form>\n");
    page("Health Risk Prediction", &body)
}

/// One section per target, one line per model family
pub fn results(subject: Option<&Subject>, results: &ResultSet) -> String {
    let mut body = String::new();

    let heading = match subject {
        Some(Subject { name, age: Some(age) }) => {
            format!("Prediction Results for {}, Age {}", escape(name), age)
        }
        Some(Subject { name, age: None }) => format!("Prediction Results for {}", escape(name)),
        None => "Prediction Results".to_string(),
    };
    let _ = writeln!(body, "    <h2>{heading}</h2>\n");

    for record in results {
        let _ = writeln!(body, "    <h3>{}</h3>\n    <ul>", escape(&record.target));
        for (family, outcome) in record.models.iter() {
            let _ = writeln!(
                body,
                "        <li>{}: {}</li>",
                family,
                escape(&outcome.to_string())
            );
        }
        body.push_str("    </ul>\n");
    }

    body.push_str("\n    <br><a href=\"/\">Try another</a>\n");
    page("Prediction Result", &body)
}

/// Plain error page for rejected form submissions
pub fn error(message: &str) -> String {
    page(
        "Invalid Input",
        &format!(
            "    <p>{}</p>\n    <a href=\"/\">Back</a>\n",
            escape(message)
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_lib::{ModelFamily, ModelOutcomes, Outcome, PredictionRecord};

    #[test]
    fn test_form_lists_features() {
        let html = form(&["BloodPressure".to_string(), "Glucose".to_string()]);
        assert!(html.contains("name=\"BloodPressure\""));
        assert!(html.contains("name=\"Glucose\""));
        assert!(html.contains("name=\"age\""));
    }

    #[test]
    fn test_results_render_every_cell() {
        let set = ResultSet::new(vec![PredictionRecord {
            target: "diabetes".to_string(),
            models: ModelOutcomes::new(vec![
                (ModelFamily::LogisticRegression, Outcome::Label(1)),
                (ModelFamily::RandomForest, Outcome::NotAvailable),
                (ModelFamily::Svm, Outcome::Error("<bad>".to_string())),
            ]),
        }]);
        let subject = Subject {
            name: "Ada".to_string(),
            age: Some(36),
        };

        let html = results(Some(&subject), &set);

        assert!(html.contains("Prediction Results for Ada, Age 36"));
        assert!(html.contains("<li>LogisticRegression: Yes (1)</li>"));
        assert!(html.contains("<li>RandomForest: Model not found</li>"));
        assert!(html.contains("<li>SVM: Error: &lt;bad&gt;</li>"));
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href='x'>&"), "&lt;a href=&#39;x&#39;&gt;&amp;");
    }
}
