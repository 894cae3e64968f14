//! Static help texts for the `info` tool

/// Topic names accepted by [`topic_text`]
pub const VALID_TOPICS: [&str; 4] = ["overview", "translate", "deploy", "data"];

const OVERVIEW: &str = "\
KoboToolbox MCP server: manage surveys on a KoboToolbox instance.

Available tools:
- list_forms: list survey forms, optionally filtered by name
- get_form: full detail for one form, including its questionnaire content
- resolve_form: find the form behind an Enketo data-collection URL
- export_form: download a form's XLSForm definition to a local file
- get_submissions: page through a form's submission records
- deploy_form: upload an XLSForm file as a new, deployed survey
- replace_form: upload a new XLSForm version onto an existing form
- export_data: export a form's submissions to CSV or XLS
- info: this help (topics: overview, translate, deploy, data)

Forms are identified by an opaque uid (e.g. aXyz123). Start with list_forms
to discover uids, or resolve_form if you only have a collection URL.";

const TRANSLATE: &str = "\
Authoring XLSForm files for deploy_form and replace_form:

An XLSForm is a spreadsheet (.xlsx) with a 'survey' sheet listing one row
per question (columns: type, name, label), an optional 'choices' sheet for
select_one/select_multiple options (columns: list_name, name, label), and
an optional 'settings' sheet (form_title, default_language).

Common question types: text, integer, decimal, date, select_one <list>,
select_multiple <list>, geopoint, note. Group questions with begin_group /
end_group rows. Add constraints with the 'constraint' column and skip logic
with 'relevant'.

To translate an existing questionnaire document into a survey, write one
survey-sheet row per question, collect answer options into the choices
sheet, then deploy the workbook with deploy_form.";

const DEPLOY: &str = "\
Deploying and replacing forms:

- deploy_form uploads an XLSForm file, creates a new survey asset, and
  activates its deployment. The result carries the new uid, the Enketo
  collection link (enketo_url), and a management URL.
- replace_form uploads a new XLSForm version onto an EXISTING uid. The
  server converts the upload asynchronously; this tool polls the import job
  (up to 60s) and then redeploys the form so the new version goes live.
  Existing submissions and the uid are preserved.
- If replace_form returns status \"timeout\", the import is still running
  on the server. Wait briefly and call get_form to check, or retry.
- If it returns status \"error\", the messages field carries the server's
  validation output; fix the XLSForm and upload again.";

const DATA: &str = "\
Reading and exporting submission data:

- get_submissions pages through raw submission records: pass limit/start
  for pagination and an optional JSON query to filter server-side, e.g.
  {\"respondent_age\": {\"$gt\": 18}}. Records are returned verbatim.
- export_data creates a server-side export (csv or xls) with groups
  separated by '/', multi-select answers in both single- and split-column
  form, and labels from all form versions. The tool polls the export job
  (up to 30s) and returns a download_url on completion. A status of
  \"pending\" means the export is still being built; call export_data again
  later to get a fresh job.";

/// Static help text, keyed by topic. No topic falls back to the overview.
pub fn topic_text(topic: Option<&str>) -> Result<&'static str, String> {
    match topic.unwrap_or("overview") {
        "overview" => Ok(OVERVIEW),
        "translate" => Ok(TRANSLATE),
        "deploy" => Ok(DEPLOY),
        "data" => Ok(DATA),
        other => Err(format!(
            "Unknown topic '{}'. Valid topics: {}",
            other,
            VALID_TOPICS.join(", ")
        )),
    }
}
