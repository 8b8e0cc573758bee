extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream, Result};
use syn::{bracketed, parse_macro_input, token, Expr, Ident, Token, Type};

struct SSTTFieldRead {
    fields: Ident,
    ty: Type,
    key: Expr,
}

impl Parse for SSTTFieldRead {
    fn parse(input: ParseStream) -> Result<Self> {
        let content;
        let fields: Ident = input.parse()?;
        let _paren: token::Bracket = bracketed!(content in input);
        let key: Expr = content.parse()?;
        input.parse::<Token![as]>()?;
        let ty: Type = input.parse()?;

        Ok(SSTTFieldRead { fields, ty, key })
    }
}

// example use
// read_sstt_field!(fields[FIELD_TIME_UNIT] as Float);
#[proc_macro]
pub fn read_sstt_field(input: TokenStream) -> TokenStream {
    let SSTTFieldRead { fields, ty, key } = parse_macro_input!(input as SSTTFieldRead);

    let output = quote! {
        if let FieldValue::#ty(x) = #fields
            .get(#key)
            .ok_or_else(|| Error::InvalidHeader(String::from(
                format!("Header is missing {}", #key),
            )))? {
                x.clone()
        } else {
            return Err(Error::WrongFieldVariant);
        }
    };
    TokenStream::from(output)
}
