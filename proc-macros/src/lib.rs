use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input};

/// Derive a record type for a struct with named fields.
///
/// Every field type must implement `Typed`, `Into<Value>` and
/// `TryFrom<Value>`. The type is named after the struct unless overridden
/// with `#[record(name = "...")]`, and is added to every registry built with
/// `Registry::new`.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let ident = input.ident;
    let record_name = record_name(&input.attrs)?
        .unwrap_or_else(|| LitStr::new(&ident.to_string(), Span::call_site()));

    let fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            Fields::Unit => Default::default(),
            Fields::Unnamed(fields) => {
                return Err(syn::Error::new_spanned(
                    fields,
                    "records must have named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "only structs can be derived as records",
            ));
        }
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.generics,
            "records cannot be generic",
        ));
    }

    let field_idents: Vec<Ident> = fields
        .iter()
        .filter_map(|field| field.ident.clone())
        .collect();
    let field_names: Vec<String> = field_idents.iter().map(|i| i.to_string()).collect();
    let field_types: Vec<_> = fields.iter().map(|field| field.ty.clone()).collect();
    let field_indices: Vec<usize> = (0..field_idents.len()).collect();

    Ok(quote! {
        impl ::records_rs::records::RecordCompatible for #ident {
            fn rtd() -> ::std::sync::Arc<::records_rs::records::RecordType> {
                static RTD: ::std::sync::LazyLock<::std::sync::Arc<::records_rs::records::RecordType>> =
                    ::std::sync::LazyLock::new(|| {
                        ::records_rs::records::RecordType::builder(#record_name)
                            #(
                                .component(
                                    #field_names,
                                    <#field_types as ::records_rs::value::Typed>::value_type(),
                                )
                            )*
                            .build()
                            .expect("derived record types have distinct field names")
                    });
                RTD.clone()
            }

            fn into_record(self) -> ::records_rs::records::Record {
                <Self as ::records_rs::records::RecordCompatible>::rtd()
                    .construct(vec![ #( ::records_rs::value::Value::from(self.#field_idents), )* ])
                    .expect("derived fields convert to their component types")
            }

            fn try_from_record(
                record: &::records_rs::records::Record,
            ) -> Result<Self, ::records_rs::exceptions::Condition> {
                let rtd = <Self as ::records_rs::records::RecordCompatible>::rtd();
                if !::std::sync::Arc::ptr_eq(record.rtd(), &rtd) {
                    return Err(::records_rs::exceptions::Condition::conversion_error(
                        #record_name,
                        &record.rtd().name().to_str(),
                    ));
                }
                let slots = record.slots();
                Ok(Self {
                    #(
                        #field_idents: <#field_types as ::std::convert::TryFrom<::records_rs::value::Value>>::try_from(
                            slots[#field_indices].clone()
                        ).map_err(::records_rs::exceptions::Condition::from)?,
                    )*
                })
            }
        }

        impl ::records_rs::value::Typed for #ident {
            fn value_type() -> ::records_rs::value::ValueType {
                ::records_rs::value::ValueType::record(
                    &<Self as ::records_rs::records::RecordCompatible>::rtd()
                )
            }
        }

        impl From<#ident> for ::records_rs::value::Value {
            fn from(value: #ident) -> Self {
                ::records_rs::value::Value::Record(
                    ::records_rs::records::RecordCompatible::into_record(value)
                )
            }
        }

        impl ::std::convert::TryFrom<::records_rs::value::Value> for #ident {
            type Error = ::records_rs::exceptions::Condition;

            fn try_from(value: ::records_rs::value::Value) -> Result<Self, Self::Error> {
                match value {
                    ::records_rs::value::Value::Record(record) => {
                        <Self as ::records_rs::records::RecordCompatible>::try_from_record(&record)
                    }
                    other => Err(::records_rs::exceptions::Condition::conversion_error(
                        #record_name,
                        &other.type_name(),
                    )),
                }
            }
        }

        ::records_rs::inventory::submit! {
            ::records_rs::registry::StaticRecord::new(
                <#ident as ::records_rs::records::RecordCompatible>::rtd
            )
        }
    })
}

fn record_name(attrs: &[syn::Attribute]) -> syn::Result<Option<LitStr>> {
    let mut name = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name = Some(meta.value()?.parse::<LitStr>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported record attribute"))
            }
        })?;
    }
    Ok(name)
}
