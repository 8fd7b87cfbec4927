use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Field, Fields, Index, Member, Type, parse_macro_input,
    spanned::Spanned,
};

/// Derive macro for the `HashCode` trait.
///
/// # Field selection
///
/// - Mark exactly one field with `#[hash_code]` to place the value by that
///   field's own `HashCode`. Typical for servers identified by an address or
///   an id.
/// - With no marked field, the value is hashed through its `Debug` rendering
///   (`concord::hash::hash_debug`), which requires `Debug` and treats equal
///   renderings as equal keys.
///
/// # Example
///
/// ```
/// use concord::HashCode;
///
/// #[derive(HashCode)]
/// struct Db {
///     #[hash_code]
///     addr: String,
///     weight: u32,
/// }
///
/// let db = Db { addr: "192.168.1.135:3551".into(), weight: 1 };
/// assert_eq!(db.hash_code(), "192.168.1.135:3551".hash_code());
/// ```
///
/// # Compile Errors
///
/// ```compile_fail
/// # use concord::HashCode;
/// #[derive(HashCode)]
/// struct TwoKeys {
///     #[hash_code]
///     a: u32,
///     #[hash_code]
///     b: u32,
/// }
/// ```
#[proc_macro_derive(HashCode, attributes(hash_code))]
pub fn derive_hash_code(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_hash_code_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn get_crate_path() -> proc_macro2::TokenStream {
    match crate_name("concord") {
        Ok(FoundCrate::Itself) => {
            quote!(::concord)
        }
        Ok(FoundCrate::Name(name)) => {
            let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
            quote!(::#ident)
        }
        Err(_) => {
            quote!(::concord)
        }
    }
}

/// The field that decides placement: how to reach it, and its type.
struct HashField {
    member: Member,
    ty: Type,
}

fn derive_hash_code_impl(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let hash_field = find_hash_field(&input)?;

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let crate_path = get_crate_path();

    let mut where_predicates = where_clause
        .map(|w| w.predicates.iter().cloned().collect::<Vec<_>>())
        .unwrap_or_default();

    let body = match &hash_field {
        Some(HashField { member, ty }) => {
            where_predicates.push(syn::parse_quote! {
                #ty: #crate_path::hash::HashCode
            });
            quote! { #crate_path::hash::HashCode::hash_code(&self.#member) }
        }
        None => quote! { #crate_path::hash::hash_debug(self) },
    };

    let where_tokens = if where_predicates.is_empty() {
        quote! {}
    } else {
        quote! { where #(#where_predicates),* }
    };

    Ok(quote! {
        impl #impl_generics #crate_path::hash::HashCode for #name #ty_generics #where_tokens {
            #[inline]
            fn hash_code(&self) -> u32 {
                #body
            }
        }
    })
}

fn is_marked(field: &Field) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident("hash_code"))
}

fn check_marker_is_bare(field: &Field) -> syn::Result<()> {
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("hash_code")) {
        attr.meta.require_path_only()?;
    }
    Ok(())
}

fn find_hash_field(input: &DeriveInput) -> syn::Result<Option<HashField>> {
    match &input.data {
        Data::Struct(data_struct) => {
            let mut found: Option<HashField> = None;

            for (index, field) in data_struct.fields.iter().enumerate() {
                if !is_marked(field) {
                    continue;
                }
                check_marker_is_bare(field)?;

                if found.is_some() {
                    return Err(Error::new(
                        field.span(),
                        "only one field may be marked #[hash_code]\n\
                         help: combine the identifying parts into one field, \
                         or implement HashCode by hand",
                    ));
                }

                let member = match &field.ident {
                    Some(ident) => Member::Named(ident.clone()),
                    None => Member::Unnamed(Index::from(index)),
                };
                found = Some(HashField {
                    member,
                    ty: field.ty.clone(),
                });
            }

            Ok(found)
        }

        Data::Enum(data_enum) => {
            let marked = data_enum
                .variants
                .iter()
                .flat_map(|variant| variant_fields(&variant.fields))
                .find(|field| is_marked(field));

            match marked {
                Some(field) => Err(Error::new(
                    field.span(),
                    "#[hash_code] is only supported on struct fields\n\
                     help: enums are hashed through their Debug rendering",
                )),
                None => Ok(None),
            }
        }

        Data::Union(u) => Err(Error::new(
            u.union_token.span,
            "HashCode cannot be derived for unions",
        )),
    }
}

fn variant_fields(fields: &Fields) -> Vec<&Field> {
    match fields {
        Fields::Named(fields) => fields.named.iter().collect(),
        Fields::Unnamed(fields) => fields.unnamed.iter().collect(),
        Fields::Unit => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn member_of(input: &DeriveInput) -> Option<Member> {
        find_hash_field(input).unwrap().map(|field| field.member)
    }

    #[test]
    fn test_finds_named_field() {
        let input: DeriveInput = parse_quote! {
            struct Db {
                weight: u32,
                #[hash_code]
                addr: String,
            }
        };
        let expected: Member = parse_quote!(addr);
        assert_eq!(member_of(&input), Some(expected));
    }

    #[test]
    fn test_finds_tuple_field() {
        let input: DeriveInput = parse_quote! {
            struct Id(u8, #[hash_code] u64);
        };
        assert_eq!(member_of(&input), Some(Member::Unnamed(Index::from(1))));
    }

    #[test]
    fn test_unmarked_struct_falls_back() {
        let input: DeriveInput = parse_quote! {
            struct Opaque {
                x: u32,
            }
        };
        assert!(member_of(&input).is_none());
    }

    #[test]
    fn test_unit_struct_falls_back() {
        let input: DeriveInput = parse_quote! {
            struct Marker;
        };
        assert!(member_of(&input).is_none());
    }

    #[test]
    fn test_rejects_two_marked_fields() {
        let input: DeriveInput = parse_quote! {
            struct Both {
                #[hash_code]
                a: u32,
                #[hash_code]
                b: u32,
            }
        };
        assert!(find_hash_field(&input).is_err());
    }

    #[test]
    fn test_rejects_marker_with_arguments() {
        let input: DeriveInput = parse_quote! {
            struct Args {
                #[hash_code(crc)]
                a: u32,
            }
        };
        assert!(find_hash_field(&input).is_err());
    }

    #[test]
    fn test_plain_enum_falls_back() {
        let input: DeriveInput = parse_quote! {
            enum Region {
                East,
                West(u8),
            }
        };
        assert!(member_of(&input).is_none());
    }

    #[test]
    fn test_rejects_marked_enum_field() {
        let input: DeriveInput = parse_quote! {
            enum Region {
                East(#[hash_code] u8),
            }
        };
        assert!(find_hash_field(&input).is_err());
    }

    #[test]
    fn test_rejects_union() {
        let input: DeriveInput = parse_quote! {
            union Bits {
                x: u32,
                y: f32,
            }
        };
        assert!(find_hash_field(&input).is_err());
    }

    #[test]
    fn test_generic_field_gets_bound() {
        let input: DeriveInput = parse_quote! {
            struct Keyed<K> {
                #[hash_code]
                key: K,
            }
        };
        let tokens = derive_hash_code_impl(input).unwrap().to_string();
        assert!(tokens.contains("where K :"));
    }
}
