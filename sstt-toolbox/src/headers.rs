pub enum File {
    Sstt(crate::parsers::sstt::SSTTFile),
}
