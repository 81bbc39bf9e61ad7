//! The DRM header found in the extended content encryption object of protected ASF files.
//!
//! The header is a small XML document:
//! ```xml
//! <WRMHEADER version="2.0.0.0">
//!   <DATA>
//!     <SECURITYVERSION>2.2</SECURITYVERSION>
//!     <CID>...</CID>
//!     <LAINFO>http://...</LAINFO>
//!     <KID>...</KID>
//!     <CHECKSUM>...</CHECKSUM>
//!     <!-- vendor specific fields -->
//!   </DATA>
//!   <SIGNATURE>...</SIGNATURE>
//! </WRMHEADER>
//! ```
use tracing::debug;

/// The license acquisition url of files distributed through Weed.
pub const WEED_LAINFO: &str = "http://www.shmedlic.com/license/lainfo.aspx";
/// Prefix of the license text of protected files.
pub const PROTECTED: &str = "Protected: ";

const MAX_DEPTH: usize = 64;

/// An element of a parsed XML document.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    /// Indices of the child elements in the tree.
    pub children: Vec<usize>,
}

impl XmlNode {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// An XML document stored as a flat list of elements, the root element is stored first.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
}

impl XmlTree {
    /// Parses a document, returns `None` if it isn't well formed.
    pub fn parse(xml: &str) -> Option<Self> {
        let mut nodes: Vec<XmlNode> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        let mut rest = xml.trim_start_matches('\u{feff}');

        while !rest.is_empty() {
            if let Some(r) = rest.strip_prefix("<?") {
                rest = &r[r.find("?>")? + 2..];
            } else if let Some(r) = rest.strip_prefix("<!--") {
                rest = &r[r.find("-->")? + 3..];
            } else if let Some(r) = rest.strip_prefix("<![CDATA[") {
                let end = r.find("]]>")?;
                nodes[*stack.last()?].text.push_str(&r[..end]);
                rest = &r[end + 3..];
            } else if let Some(r) = rest.strip_prefix("<!") {
                rest = &r[r.find('>')? + 1..];
            } else if let Some(r) = rest.strip_prefix("</") {
                let end = r.find('>')?;
                let top = stack.pop()?;
                if nodes[top].name != r[..end].trim() {
                    return None;
                }
                rest = &r[end + 1..];
            } else if let Some(r) = rest.strip_prefix('<') {
                let end = r.find('>')?;
                let (tag, self_closing) = match r[..end].strip_suffix('/') {
                    Some(t) => (t, true),
                    None => (&r[..end], false),
                };
                rest = &r[end + 1..];

                let node = parse_element(tag)?;
                let index = nodes.len();
                match stack.last() {
                    Some(&parent) => nodes[parent].children.push(index),
                    None if index != 0 => return None,
                    None => (),
                }
                nodes.push(node);

                if !self_closing {
                    if stack.len() >= MAX_DEPTH {
                        return None;
                    }
                    stack.push(index);
                }
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                let text = &rest[..end];
                match stack.last() {
                    Some(&top) => nodes[top].text.push_str(&unescape(text)),
                    None if !text.trim().is_empty() => return None,
                    None => (),
                }
                rest = &rest[end..];
            }
        }

        if !stack.is_empty() || nodes.is_empty() {
            return None;
        }
        Some(Self { nodes })
    }

    pub fn root(&self) -> &XmlNode {
        &self.nodes[0]
    }

    pub fn children<'a>(&'a self, node: &'a XmlNode) -> impl Iterator<Item = &'a XmlNode> {
        node.children.iter().filter_map(|&i| self.nodes.get(i))
    }

    /// Returns the first child element with the name, ignoring ASCII case.
    pub fn child<'a>(&'a self, node: &'a XmlNode, name: &str) -> Option<&'a XmlNode> {
        self.children(node).find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

fn parse_element(tag: &str) -> Option<XmlNode> {
    let tag = tag.trim();
    let name_end = tag.find(char::is_whitespace).unwrap_or(tag.len());
    let name = &tag[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut attributes = Vec::new();
    let mut rest = tag[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        let value = rest[eq + 1..].trim_start();
        let quote = value.chars().next().filter(|&c| c == '"' || c == '\'')?;
        let value = &value[1..];
        let end = value.find(quote)?;
        attributes.push((key.to_owned(), unescape(&value[..end])));
        rest = value[end + 1..].trim_start();
    }

    Some(XmlNode { name: name.to_owned(), attributes, ..Default::default() })
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// The generic Windows Media DRM header.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WrmHeader {
    /// The `version` attribute of the root element.
    pub version: Option<String>,
    /// Trimmed text of every element inside `DATA`, in document order.
    pub data: Vec<(String, String)>,
}

impl WrmHeader {
    /// Parses the header document. Returns `None` if the document isn't well formed or its root
    /// isn't a `WRMHEADER` element.
    pub fn parse(xml: &str) -> Option<Self> {
        let tree = XmlTree::parse(xml.trim())?;
        let root = tree.root();
        if !root.name.eq_ignore_ascii_case("WRMHEADER") {
            debug!("drm header root is {}", root.name);
            return None;
        }

        let mut header = WrmHeader {
            version: root.attribute("version").map(str::to_owned),
            data: Vec::new(),
        };
        if let Some(data) = tree.child(root, "DATA") {
            for field in tree.children(data) {
                header.data.push((field.name.clone(), field.text.trim().to_owned()));
            }
        }

        Some(header)
    }

    /// Returns the non-empty text of the `DATA` element with the name, ignoring ASCII case.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.data
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn security_version(&self) -> Option<&str> {
        self.field("SECURITYVERSION")
    }

    pub fn content_id(&self) -> Option<&str> {
        self.field("CID")
    }

    /// The license acquisition url.
    pub fn license_acquisition(&self) -> Option<&str> {
        self.field("LAINFO")
    }

    pub fn key_id(&self) -> Option<&str> {
        self.field("KID")
    }

    pub fn checksum(&self) -> Option<&str> {
        self.field("CHECKSUM")
    }

    /// Returns true if all required header fields are present.
    pub fn is_valid(&self) -> bool {
        self.security_version().is_some()
            && self.content_id().is_some()
            && self.license_acquisition().is_some()
            && self.key_id().is_some()
            && self.checksum().is_some()
    }
}

/// The vendor schema of files distributed through Weed, an extension of [`WrmHeader`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WeedInfo {
    pub header: WrmHeader,
}

impl WeedInfo {
    pub fn version_id(&self) -> Option<&str> {
        self.header.field("VersionID")
    }

    pub fn weed_content_id(&self) -> Option<&str> {
        self.header.field("ContentID")
    }

    pub fn ice9(&self) -> Option<&str> {
        self.header.field("ice9")
    }

    pub fn license_date(&self) -> Option<&str> {
        self.header.field("License_Date")
    }

    pub fn license_distributor(&self) -> Option<&str> {
        self.header.field("License_Distributor")
    }

    pub fn license_distributor_url(&self) -> Option<&str> {
        self.header.field("License_Distributor_URL")
    }

    pub fn publish_date(&self) -> Option<&str> {
        self.header.field("Publish_Date")
    }

    pub fn content_distributor(&self) -> Option<&str> {
        self.header.field("Content_Distributor")
    }

    pub fn price(&self) -> Option<&str> {
        self.header.field("Price")
    }

    pub fn collection(&self) -> Option<&str> {
        self.header.field("Collection")
    }

    pub fn description(&self) -> Option<&str> {
        self.header.field("Description")
    }

    pub fn copyright(&self) -> Option<&str> {
        self.header.field("Copyright")
    }

    pub fn author(&self) -> Option<&str> {
        self.header.field("Author")
    }

    pub fn title(&self) -> Option<&str> {
        self.header.field("Title")
    }

    /// Returns true if the header is valid, points to the Weed license server and carries the
    /// Weed identifiers.
    pub fn is_valid(&self) -> bool {
        self.header.is_valid()
            && self.header.license_acquisition() == Some(WEED_LAINFO)
            && self.version_id().is_some()
            && self.weed_content_id().is_some()
            && self.ice9().is_some()
    }

    /// Describes the license of the file.
    pub fn license_info(&self) -> String {
        let mut info = String::from("Weed");
        if let Some(c) = self.copyright() {
            info.push_str(&format!(" {c}."));
        }
        if let (Some(distributor), Some(date)) = (self.license_distributor(), self.license_date()) {
            info.push_str(&format!(" Licensed by {distributor} on {date}."));
        }
        info.push_str(&format!(
            " Content ID: {}, Version ID: {}",
            self.weed_content_id().unwrap_or_default(),
            self.version_id().unwrap_or_default(),
        ));
        info
    }
}

/// A parsed DRM header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Drm {
    /// A valid header of an unknown vendor.
    Header(WrmHeader),
    /// A valid Weed header.
    Weed(WeedInfo),
}

impl Drm {
    /// Parses the header document, returns `None` unless it is a valid DRM header.
    pub fn parse(xml: &str) -> Option<Self> {
        let header = WrmHeader::parse(xml)?;
        if !header.is_valid() {
            debug!("drm header is missing required fields");
            return None;
        }

        let weed = WeedInfo { header };
        match weed.is_valid() {
            true => Some(Drm::Weed(weed)),
            false => Some(Drm::Header(weed.header)),
        }
    }

    pub fn header(&self) -> &WrmHeader {
        match self {
            Drm::Header(h) => h,
            Drm::Weed(w) => &w.header,
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub fn header_xml(lainfo: &str, vendor_fields: &str) -> String {
        format!(
            "<WRMHEADER version=\"2.0.0.0\"><DATA>\
             <SECURITYVERSION>2.2</SECURITYVERSION><CID>cid</CID>\
             <LAINFO>{lainfo}</LAINFO><KID>kid==</KID><CHECKSUM>sum</CHECKSUM>\
             {vendor_fields}</DATA><SIGNATURE><VALUE>sig</VALUE></SIGNATURE></WRMHEADER>"
        )
    }

    pub const WEED_FIELDS: &str = "<VersionID>7</VersionID><ContentID>42</ContentID>\
        <ice9>ice</ice9><Collection>Album</Collection><Description>Desc</Description>\
        <Copyright>(c) Band</Copyright><Author>Band</Author><Title>Song</Title>";

    #[test]
    fn xml_tree() {
        let tree = XmlTree::parse(
            "<?xml version=\"1.0\"?><!-- c --><a x='1'><b>one &amp; two</b><c/><b>three</b></a>",
        )
        .unwrap();
        let root = tree.root();
        assert_eq!(root.name, "a");
        assert_eq!(root.attribute("x"), Some("1"));
        assert_eq!(tree.children(root).count(), 3);
        assert_eq!(tree.child(root, "B").unwrap().text, "one & two");
    }

    #[test]
    fn malformed_xml() {
        assert!(XmlTree::parse("<a><b></a></b>").is_none());
        assert!(XmlTree::parse("<a>").is_none());
        assert!(XmlTree::parse("<a></a><b></b>").is_none());
        assert!(XmlTree::parse("<a x=1></a>").is_none());
        assert!(XmlTree::parse("").is_none());
        let deep = "<a>".repeat(100) + &"</a>".repeat(100);
        assert!(XmlTree::parse(&deep).is_none());
    }

    #[test]
    fn generic_header() {
        let drm = Drm::parse(&header_xml("http://license.example", "")).unwrap();
        assert!(matches!(drm, Drm::Header(_)));
        assert_eq!(drm.header().key_id(), Some("kid=="));
        assert_eq!(drm.header().version.as_deref(), Some("2.0.0.0"));
    }

    #[test]
    fn weed_header() {
        let drm = Drm::parse(&header_xml(WEED_LAINFO, WEED_FIELDS)).unwrap();
        let Drm::Weed(weed) = drm else { panic!("expected weed header") };
        assert_eq!(weed.author(), Some("Band"));
        assert_eq!(weed.collection(), Some("Album"));
        assert_eq!(weed.license_info(), "Weed (c) Band. Content ID: 42, Version ID: 7");
    }

    #[test]
    fn weed_distribution() {
        let fields = format!(
            "{WEED_FIELDS}<License_Date>2004-01-01</License_Date>\
            <License_Distributor>Shop</License_Distributor>\
            <License_Distributor_URL>http://shop.example</License_Distributor_URL>\
            <Publish_Date>2003</Publish_Date><Content_Distributor>Label</Content_Distributor>\
            <Price>0.99</Price>"
        );
        let drm = Drm::parse(&header_xml(WEED_LAINFO, &fields)).unwrap();
        let Drm::Weed(weed) = drm else { panic!("expected weed header") };
        assert_eq!(weed.license_distributor_url(), Some("http://shop.example"));
        assert_eq!(weed.publish_date(), Some("2003"));
        assert_eq!(weed.content_distributor(), Some("Label"));
        assert_eq!(weed.price(), Some("0.99"));
        assert_eq!(
            weed.license_info(),
            "Weed (c) Band. Licensed by Shop on 2004-01-01. Content ID: 42, Version ID: 7"
        );
    }

    #[test]
    fn missing_required_field() {
        let xml = "<WRMHEADER><DATA><CID>cid</CID></DATA></WRMHEADER>";
        assert!(Drm::parse(xml).is_none());
    }
}
