//! Protocol message templates
//!
//! Every message here is the body of one `<rpc>`; drivers add the envelope.
//! Group names are XML-escaped before substitution.

use quick_xml::escape::escape;

/// Bare commit of the candidate configuration
pub const COMMIT: &str = "<commit/>";

/// Orderly session teardown
pub const CLOSE_SESSION: &str = "<close-session/>";

/// Remove a group definition and its apply-groups reference.
///
/// `default-operation` is `none` so nothing outside the two deleted nodes is
/// touched by the edit.
pub fn delete_group(group: &str) -> String {
    let group = escape(group);
    format!(
        r#"<edit-config>
	<target>
		<candidate/>
	</target>
	<default-operation>none</default-operation>
	<config>
		<configuration>
			<groups operation="delete">
				<name>{group}</name>
			</groups>
			<apply-groups operation="delete">{group}</apply-groups>
		</configuration>
	</config>
</edit-config>"#
    )
}

/// Wrap an XML configuration payload in a merge load
pub fn load_merge(payload: &str) -> String {
    format!(
        r#"<load-configuration action="merge" format="xml">
{payload}
</load-configuration>
"#
    )
}

/// Read one group from the committed database as text
pub fn get_group_text(group: &str) -> String {
    format!(
        r#"<get-configuration database="committed" format="text">
  <configuration>
  <groups><name>{}</name></groups>
  </configuration>
</get-configuration>
"#,
        escape(group)
    )
}

/// Read one group as XML
pub fn get_group_xml(group: &str) -> String {
    format!(
        r#"<get-configuration>
  <configuration>
  <groups><name>{}</name></groups>
  </configuration>
</get-configuration>
"#,
        escape(group)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_targets_group_and_apply_groups() {
        let message = delete_group("interfaces");
        assert!(message.starts_with("<edit-config>"));
        assert!(message.contains("<default-operation>none</default-operation>"));
        assert!(message.contains("<name>interfaces</name>"));
        assert!(message.contains(r#"<apply-groups operation="delete">interfaces</apply-groups>"#));
        assert!(message.contains("<candidate/>"));
    }

    #[test]
    fn test_group_names_are_escaped() {
        let message = delete_group("a<b&c");
        assert!(message.contains("<name>a&lt;b&amp;c</name>"));
        assert!(!message.contains("a<b"));

        let read = get_group_xml("x</name>");
        assert!(read.contains("<name>x&lt;/name&gt;</name>"));
    }

    #[test]
    fn test_merge_wraps_payload_verbatim() {
        let message = load_merge("<group-content/>");
        assert!(message.starts_with(r#"<load-configuration action="merge" format="xml">"#));
        assert!(message.contains("\n<group-content/>\n"));
        assert!(message.trim_end().ends_with("</load-configuration>"));
    }

    #[test]
    fn test_read_templates() {
        let text = get_group_text("ntp");
        assert!(text.contains(r#"database="committed""#));
        assert!(text.contains(r#"format="text""#));
        assert!(text.contains("<groups><name>ntp</name></groups>"));

        let xml = get_group_xml("ntp");
        assert!(xml.starts_with("<get-configuration>"));
        assert!(!xml.contains("database="));
        assert!(xml.contains("<groups><name>ntp</name></groups>"));
    }
}
