pub trait FileExtProvider {
    fn file_ext(&self) -> &'static str;
}
